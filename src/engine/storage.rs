//! Storage reconciler.
//!
//! Re-materializes captured blobs into their live buckets at the original
//! relative paths. Runs after table restoration so the rows referencing
//! these paths already exist.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::archive::{ArchiveReader, StorageManifest};
use crate::engine::report::BucketOutcome;
use crate::mime;
use crate::store::BucketStore;

pub struct StorageReconciler<'a> {
    buckets: &'a BucketStore,
    allowlist: &'a [String],
}

impl<'a> StorageReconciler<'a> {
    pub fn new(buckets: &'a BucketStore, allowlist: &'a [String]) -> Self {
        Self { buckets, allowlist }
    }

    /// Reconcile every allow-listed bucket named by the manifest. Buckets
    /// absent from the manifest are skipped entirely; per-file failures
    /// increment that bucket's error counter and the loop continues.
    pub fn run(
        &self,
        manifest: &StorageManifest,
        archive: &mut dyn ArchiveReader,
    ) -> BTreeMap<String, BucketOutcome> {
        let mut details = BTreeMap::new();

        for bucket in self.allowlist {
            let Some(paths) = manifest.get(bucket) else {
                continue;
            };
            let mut outcome = BucketOutcome::default();

            for path in paths {
                let bytes = match archive.fetch_blob(bucket, path) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        warn!(bucket, path, %err, "blob fetch failed");
                        outcome.errors += 1;
                        continue;
                    }
                };
                let content_type = mime::content_type_for(path);
                match self.buckets.put(bucket, path, &bytes, content_type) {
                    Ok(()) => outcome.restored += 1,
                    Err(err) => {
                        warn!(bucket, path, %err, "blob upload failed");
                        outcome.errors += 1;
                    }
                }
            }

            debug!(
                bucket,
                restored = outcome.restored,
                errors = outcome.errors,
                "bucket reconciled"
            );
            details.insert(bucket.clone(), outcome);
        }

        details
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveMeta, TableDataset};
    use crate::error::{RebakError, Result};
    use serde_json::json;

    struct BlobArchive {
        meta: ArchiveMeta,
        blobs: BTreeMap<(String, String), Vec<u8>>,
    }

    impl BlobArchive {
        fn new(blobs: BTreeMap<(String, String), Vec<u8>>) -> Self {
            let meta = serde_json::from_value(json!({
                "version": 2,
                "created_at": "2026-03-01T12:00:00Z",
            }))
            .unwrap();
            Self { meta, blobs }
        }
    }

    impl ArchiveReader for BlobArchive {
        fn meta(&self) -> &ArchiveMeta {
            &self.meta
        }

        fn dataset(&mut self, _table: &str) -> Result<TableDataset> {
            Ok(TableDataset::new())
        }

        fn manifest(&self) -> StorageManifest {
            StorageManifest::new()
        }

        fn fetch_blob(&mut self, bucket: &str, path: &str) -> Result<Vec<u8>> {
            self.blobs
                .get(&(bucket.to_string(), path.to_string()))
                .cloned()
                .ok_or_else(|| RebakError::NotFound(format!("{bucket}/{path}")))
        }
    }

    fn allowlist(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn restores_blobs_with_inferred_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let store = BucketStore::open(dir.path()).unwrap();
        let allow = allowlist(&["documents"]);

        let mut archive = BlobArchive::new(BTreeMap::from([
            (
                ("documents".to_string(), "org-1/q3.pdf".to_string()),
                b"pdf".to_vec(),
            ),
            (
                ("documents".to_string(), "org-1/raw.bin9".to_string()),
                b"raw".to_vec(),
            ),
        ]));
        let manifest = StorageManifest::from([(
            "documents".to_string(),
            vec!["org-1/q3.pdf".to_string(), "org-1/raw.bin9".to_string()],
        )]);

        let details =
            StorageReconciler::new(&store, &allow).run(&manifest, &mut archive);

        assert_eq!(details["documents"].restored, 2);
        assert_eq!(details["documents"].errors, 0);
        let pdf = store.object_meta("documents", "org-1/q3.pdf").unwrap().unwrap();
        assert_eq!(pdf.content_type, "application/pdf");
        let raw = store.object_meta("documents", "org-1/raw.bin9").unwrap().unwrap();
        assert_eq!(raw.content_type, "application/octet-stream");
    }

    #[test]
    fn fetch_failures_count_and_do_not_halt() {
        let dir = tempfile::tempdir().unwrap();
        let store = BucketStore::open(dir.path()).unwrap();
        let allow = allowlist(&["avatars"]);

        let mut archive = BlobArchive::new(BTreeMap::from([(
            ("avatars".to_string(), "u2.png".to_string()),
            b"png".to_vec(),
        )]));
        let manifest = StorageManifest::from([(
            "avatars".to_string(),
            vec!["u1.png".to_string(), "u2.png".to_string()],
        )]);

        let details = StorageReconciler::new(&store, &allow).run(&manifest, &mut archive);

        assert_eq!(details["avatars"].restored, 1);
        assert_eq!(details["avatars"].errors, 1);
    }

    #[test]
    fn buckets_absent_from_manifest_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = BucketStore::open(dir.path()).unwrap();
        let allow = allowlist(&["avatars", "documents"]);

        let mut archive = BlobArchive::new(BTreeMap::new());
        let manifest = StorageManifest::from([("avatars".to_string(), vec![])]);

        let details = StorageReconciler::new(&store, &allow).run(&manifest, &mut archive);

        assert!(details.contains_key("avatars"));
        assert!(!details.contains_key("documents"));
        assert_eq!(details["avatars"], BucketOutcome::default());
    }

    #[test]
    fn unknown_buckets_in_manifest_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = BucketStore::open(dir.path()).unwrap();
        let allow = allowlist(&["avatars"]);

        let mut archive = BlobArchive::new(BTreeMap::from([(
            ("secrets".to_string(), "x".to_string()),
            b"x".to_vec(),
        )]));
        let manifest =
            StorageManifest::from([("secrets".to_string(), vec!["x".to_string()])]);

        let details = StorageReconciler::new(&store, &allow).run(&manifest, &mut archive);
        assert!(details.is_empty());
    }
}
