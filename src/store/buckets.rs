//! Live bucket storage.
//!
//! Blobs are restored at their original relative path inside their bucket:
//! table rows reference files by path, so path-preserving writes keep those
//! references valid. Each bucket keeps an object index recording size and
//! inferred content type per path.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RebakError, Result};
use crate::store::content::normalize_path;

const INDEX_FILE: &str = ".objects.json";

/// Per-object metadata in the bucket index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub size: u64,
    pub content_type: String,
}

/// Filesystem-backed live bucket store rooted at a directory, one
/// subdirectory per bucket.
pub struct BucketStore {
    root: PathBuf,
}

impl BucketStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .map_err(|err| RebakError::Config(format!("create {}: {err}", root.display())))?;
        Ok(Self { root })
    }

    /// Write a blob at its original relative path, overwriting any existing
    /// object, and record it in the bucket index.
    pub fn put(&self, bucket: &str, path: &str, bytes: &[u8], content_type: &str) -> Result<()> {
        let full = self.resolve(bucket, path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                RebakError::Config(format!("create {}: {err}", parent.display()))
            })?;
        }
        fs::write(&full, bytes)
            .map_err(|err| RebakError::Config(format!("write {}: {err}", full.display())))?;

        let mut index = self.load_index(bucket)?;
        index.insert(
            path.to_string(),
            ObjectMeta {
                size: bytes.len() as u64,
                content_type: content_type.to_string(),
            },
        );
        self.store_index(bucket, &index)
    }

    /// Metadata for one object, if present.
    pub fn object_meta(&self, bucket: &str, path: &str) -> Result<Option<ObjectMeta>> {
        Ok(self.load_index(bucket)?.remove(path))
    }

    /// Number of objects recorded in a bucket.
    pub fn object_count(&self, bucket: &str) -> Result<usize> {
        Ok(self.load_index(bucket)?.len())
    }

    /// Read a blob back.
    pub fn read(&self, bucket: &str, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(bucket, path)?;
        if !full.is_file() {
            return Err(RebakError::NotFound(format!("object {bucket}/{path}")));
        }
        fs::read(&full)
            .map_err(|err| RebakError::Config(format!("read {}: {err}", full.display())))
    }

    fn resolve(&self, bucket: &str, path: &str) -> Result<PathBuf> {
        if bucket.is_empty() || bucket.contains(['/', '\\', '\0']) {
            return Err(RebakError::ValidationFailed(format!(
                "invalid bucket name: {bucket:?}"
            )));
        }
        if path.is_empty() || path.contains('\0') || path == INDEX_FILE {
            return Err(RebakError::ValidationFailed(format!(
                "invalid object path: {path:?}"
            )));
        }
        let bucket_root = self.root.join(bucket);
        let joined = bucket_root.join(path);
        let normalized = normalize_path(&joined);
        if !normalized.starts_with(normalize_path(&bucket_root)) {
            return Err(RebakError::ValidationFailed(format!(
                "object path escapes bucket: {path}"
            )));
        }
        Ok(normalized)
    }

    fn index_path(&self, bucket: &str) -> PathBuf {
        self.root.join(bucket).join(INDEX_FILE)
    }

    fn load_index(&self, bucket: &str) -> Result<BTreeMap<String, ObjectMeta>> {
        let path = self.index_path(bucket);
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&path)
            .map_err(|err| RebakError::Config(format!("read {}: {err}", path.display())))?;
        Ok(serde_json::from_str(&content)?)
    }

    fn store_index(&self, bucket: &str, index: &BTreeMap<String, ObjectMeta>) -> Result<()> {
        let path = self.index_path(bucket);
        let json = serde_json::to_string_pretty(index)?;
        fs::write(&path, json)
            .map_err(|err| RebakError::Config(format!("write {}: {err}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_preserves_original_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = BucketStore::open(dir.path()).unwrap();

        store
            .put("documents", "org-1/reports/q3.pdf", b"pdfbytes", "application/pdf")
            .unwrap();

        assert_eq!(store.read("documents", "org-1/reports/q3.pdf").unwrap(), b"pdfbytes");
        let meta = store
            .object_meta("documents", "org-1/reports/q3.pdf")
            .unwrap()
            .unwrap();
        assert_eq!(meta.content_type, "application/pdf");
        assert_eq!(meta.size, 8);
    }

    #[test]
    fn put_overwrites_on_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let store = BucketStore::open(dir.path()).unwrap();

        store.put("avatars", "u1.png", b"old", "image/png").unwrap();
        store.put("avatars", "u1.png", b"newer", "image/png").unwrap();

        assert_eq!(store.read("avatars", "u1.png").unwrap(), b"newer");
        assert_eq!(store.object_count("avatars").unwrap(), 1);
    }

    #[test]
    fn rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = BucketStore::open(dir.path().join("buckets")).unwrap();

        assert!(store.put("avatars", "../../evil", b"x", "a/b").is_err());
        assert!(store.put("av/atars", "ok.png", b"x", "a/b").is_err());
        assert!(store.put("avatars", ".objects.json", b"x", "a/b").is_err());
    }
}
