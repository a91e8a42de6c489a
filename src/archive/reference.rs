//! Reference-mode archive: metadata fetched from the content store by path.

use crate::archive::{
    rows_from_value, ArchiveMeta, ArchiveReader, StorageManifest, TableDataset,
};
use crate::error::{RebakError, Result};
use crate::store::ContentStore;

/// An archive opened by reference into the content store.
///
/// Table datasets are embedded in the metadata object; blob bytes resolve at
/// `<storage_prefix>/<bucket>/<path>` in the same store.
pub struct ReferenceArchive<'a> {
    meta: ArchiveMeta,
    store: &'a dyn ContentStore,
}

impl std::fmt::Debug for ReferenceArchive<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceArchive")
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

impl<'a> ReferenceArchive<'a> {
    /// Fetch and parse the archive metadata at `reference`. Any failure here
    /// is fatal to the run: an archive that cannot be opened at all.
    pub fn open(store: &'a dyn ContentStore, reference: &str) -> Result<Self> {
        let bytes = store.fetch(reference).map_err(|err| {
            RebakError::ArchiveUnreadable(format!("fetch {reference}: {err}"))
        })?;
        let meta: ArchiveMeta = serde_json::from_slice(&bytes).map_err(|err| {
            RebakError::ArchiveUnreadable(format!("parse {reference}: {err}"))
        })?;
        meta.check_supported()?;
        Ok(Self { meta, store })
    }

    fn blob_path(&self, bucket: &str, path: &str) -> Result<String> {
        let prefix = self.meta.storage_prefix.as_deref().ok_or_else(|| {
            RebakError::ValidationFailed("archive has no storage prefix".into())
        })?;
        let prefix = prefix.trim_end_matches('/');
        Ok(format!("{prefix}/{bucket}/{path}"))
    }
}

impl ArchiveReader for ReferenceArchive<'_> {
    fn meta(&self) -> &ArchiveMeta {
        &self.meta
    }

    fn dataset(&mut self, table: &str) -> Result<TableDataset> {
        match self.meta.tables.get(table) {
            Some(value) => rows_from_value(table, value),
            None => Ok(TableDataset::new()),
        }
    }

    fn manifest(&self) -> StorageManifest {
        self.meta.manifest()
    }

    fn fetch_blob(&mut self, bucket: &str, path: &str) -> Result<Vec<u8>> {
        let full = self.blob_path(bucket, path)?;
        self.store.fetch(&full)
    }
}
