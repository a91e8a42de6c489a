//! The restore engine: sequential phases, one aggregated result.
//!
//! Tables are replayed first so that any row referencing a storage path
//! exists before blob reconciliation begins. A started run always completes
//! and returns one report; concurrent restores against the same data root
//! are serialized by an advisory file lock.

pub mod report;
pub mod storage;
pub mod tables;

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, info};

use crate::archive::bundle::BundleArchive;
use crate::archive::reference::ReferenceArchive;
use crate::archive::{builder, ArchiveReader};
use crate::config::EngineConfig;
use crate::error::{RebakError, Result};
use crate::store::{BucketStore, ContentStore, LiveStore};

pub use report::{BucketOutcome, RestoreReport, TableOutcome};
pub use storage::StorageReconciler;
pub use tables::TableRestorer;

const LOCK_FILENAME: &str = "rebak.lock";
const LIVE_DB_FILENAME: &str = "live.db";
const STORAGE_DIRNAME: &str = "storage";

/// Advisory file lock held for the duration of one restore run.
#[derive(Debug)]
struct RunLock {
    #[allow(dead_code)]
    lock_file: File,
}

impl RunLock {
    /// Non-blocking acquire. A held lock means another restore is already
    /// running against this data root, which is fatal to this run.
    fn acquire(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;
        let lock_path = root.join(LOCK_FILENAME);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|err| RebakError::LockFailed(format!("open lock file: {err}")))?;

        match lock_file.try_lock_exclusive() {
            Ok(()) => {
                debug!(path = %lock_path.display(), "run lock acquired");
                Ok(Self { lock_file })
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => Err(
                RebakError::LockFailed("another restore is already running".into()),
            ),
            Err(err) => Err(RebakError::LockFailed(format!("acquire lock: {err}"))),
        }
    }
}

/// Backup/restore engine bound to one data root and one content store.
pub struct RestoreEngine<'a> {
    config: &'a EngineConfig,
    content: &'a dyn ContentStore,
    live: LiveStore,
    buckets: BucketStore,
    root: PathBuf,
}

impl<'a> RestoreEngine<'a> {
    /// Open the engine over `data_root` (live database plus bucket storage
    /// live underneath it).
    pub fn open(
        config: &'a EngineConfig,
        data_root: impl AsRef<Path>,
        content: &'a dyn ContentStore,
    ) -> Result<Self> {
        config.validate()?;
        let root = data_root.as_ref().to_path_buf();
        let live = LiveStore::open(root.join(LIVE_DB_FILENAME))?;
        let buckets = BucketStore::open(root.join(STORAGE_DIRNAME))?;
        Ok(Self {
            config,
            content,
            live,
            buckets,
            root,
        })
    }

    /// Restore from an archive referenced by a content-store path.
    pub fn restore_reference(&mut self, reference: &str) -> Result<RestoreReport> {
        let _lock = RunLock::acquire(&self.root)?;
        info!(reference, "restore from reference");
        let mut archive = ReferenceArchive::open(self.content, reference)?;
        Ok(self.run(&mut archive))
    }

    /// Restore from uploaded bundle bytes.
    pub fn restore_bundle(&mut self, bytes: Vec<u8>) -> Result<RestoreReport> {
        let _lock = RunLock::acquire(&self.root)?;
        info!(size = bytes.len(), "restore from bundle");
        let mut archive = BundleArchive::open(bytes)?;
        Ok(self.run(&mut archive))
    }

    /// Export the capture at `reference` as a downloadable bundle. Read-only,
    /// so no run lock is taken.
    pub fn export(&self, reference: &str) -> Result<(String, Vec<u8>)> {
        info!(reference, "export to bundle");
        builder::build(self.content, reference)
    }

    fn run(&mut self, archive: &mut dyn ArchiveReader) -> RestoreReport {
        let db_details = TableRestorer::new(
            &mut self.live,
            &self.config.table_order,
            self.config.batch_size,
        )
        .run(archive);

        let manifest = archive.manifest();
        let storage_details =
            StorageReconciler::new(&self.buckets, &self.config.buckets).run(&manifest, archive);

        let report = RestoreReport::assemble(db_details, storage_details);
        info!(
            success = report.success,
            total_restored = report.total_restored,
            total_errors = report.total_errors,
            files_restored = report.files_restored,
            file_errors = report.file_errors,
            "restore complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FsContentStore;
    use serde_json::json;

    #[test]
    fn second_lock_acquire_fails() {
        let dir = tempfile::tempdir().unwrap();
        let _held = RunLock::acquire(dir.path()).unwrap();
        let err = RunLock::acquire(dir.path()).unwrap_err();
        assert!(matches!(err, RebakError::LockFailed(_)));
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        drop(RunLock::acquire(dir.path()).unwrap());
        RunLock::acquire(dir.path()).unwrap();
    }

    #[test]
    fn unreadable_reference_aborts_with_no_partial_report() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::open(dir.path().join("store")).unwrap();
        let config = EngineConfig::default();
        let mut engine =
            RestoreEngine::open(&config, dir.path().join("data"), &store).unwrap();

        let err = engine.restore_reference("missing.json").unwrap_err();
        assert!(matches!(err, RebakError::ArchiveUnreadable(_)));
    }

    #[test]
    fn flat_archive_restores_tables_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::open(dir.path().join("store")).unwrap();
        let meta = json!({
            "created_at": "2026-03-01T12:00:00Z",
            "tables": {"organizations": [{"id": "org-1"}]}
        });
        store.put("flat.json", meta.to_string().as_bytes()).unwrap();

        let config = EngineConfig::default();
        let mut engine =
            RestoreEngine::open(&config, dir.path().join("data"), &store).unwrap();
        let report = engine.restore_reference("flat.json").unwrap();

        assert!(report.success);
        assert_eq!(report.total_restored, 1);
        assert_eq!(report.files_restored, 0);
        assert!(report.storage_details.is_empty());
    }
}
