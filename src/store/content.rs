//! Content store holding captured archives and their blobs.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{RebakError, Result};

/// Byte store addressed by relative path. The capture job writes archives
/// into one of these; the engine only ever reads from it during restore and
/// export.
pub trait ContentStore {
    /// Fetch the bytes at `path`. A missing object is `NotFound`.
    fn fetch(&self, path: &str) -> Result<Vec<u8>>;

    /// Store bytes at `path`, overwriting any existing object.
    fn put(&self, path: &str, bytes: &[u8]) -> Result<()>;
}

/// Filesystem-backed content store rooted at a directory.
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .map_err(|err| RebakError::Config(format!("create {}: {err}", root.display())))?;
        Ok(Self { root })
    }

    /// Resolve a relative object path under the root, rejecting anything
    /// that would escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        if path.is_empty() || path.contains('\0') {
            return Err(RebakError::ValidationFailed(format!(
                "invalid store path: {path:?}"
            )));
        }
        let joined = self.root.join(path);
        let normalized = normalize_path(&joined);
        if !normalized.starts_with(normalize_path(&self.root)) {
            return Err(RebakError::ValidationFailed(format!(
                "store path escapes root: {path}"
            )));
        }
        Ok(normalized)
    }
}

impl ContentStore for FsContentStore {
    fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        if !full.is_file() {
            return Err(RebakError::NotFound(format!("object {path}")));
        }
        fs::read(&full).map_err(|err| {
            RebakError::Config(format!("read {}: {err}", full.display()))
        })
    }

    fn put(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                RebakError::Config(format!("create {}: {err}", parent.display()))
            })?;
        }
        fs::write(&full, bytes)
            .map_err(|err| RebakError::Config(format!("write {}: {err}", full.display())))
    }
}

/// Normalize a path by resolving `.` and `..` components lexically, without
/// touching the filesystem.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir => {}
            other => result.push(other),
        }
    }
    result
}
