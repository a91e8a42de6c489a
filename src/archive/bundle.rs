//! Bundle-mode archive: uploaded zip bytes opened as a random-access archive.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use zip::result::ZipError;
use zip::ZipArchive;

use crate::archive::{
    rows_from_value, ArchiveMeta, ArchiveReader, StorageManifest, TableDataset, METADATA_ENTRY,
};
use crate::error::{RebakError, Result};

const TABLES_PREFIX: &str = "tables/";
const STORAGE_PREFIX: &str = "storage/";

/// An archive opened from raw bundle bytes.
///
/// Entry layout: `backup.json` metadata, `tables/<table>.json` datasets,
/// `storage/<bucket>/<path>` blobs.
#[derive(Debug)]
pub struct BundleArchive {
    zip: ZipArchive<Cursor<Vec<u8>>>,
    meta: ArchiveMeta,
}

impl BundleArchive {
    /// Open uploaded bundle bytes. Corrupt bytes or missing/unparsable
    /// metadata are fatal: the archive cannot be opened at all.
    pub fn open(bytes: Vec<u8>) -> Result<Self> {
        let mut zip = ZipArchive::new(Cursor::new(bytes))
            .map_err(|err| RebakError::ArchiveUnreadable(format!("open bundle: {err}")))?;

        let meta_bytes = read_entry(&mut zip, METADATA_ENTRY)
            .map_err(|err| RebakError::ArchiveUnreadable(format!("{METADATA_ENTRY}: {err}")))?
            .ok_or_else(|| {
                RebakError::ArchiveUnreadable(format!("bundle missing {METADATA_ENTRY}"))
            })?;
        let meta: ArchiveMeta = serde_json::from_slice(&meta_bytes).map_err(|err| {
            RebakError::ArchiveUnreadable(format!("parse {METADATA_ENTRY}: {err}"))
        })?;
        meta.check_supported()?;

        Ok(Self { zip, meta })
    }

    /// Per-bucket file sets derived by scanning `storage/<bucket>/` entry
    /// paths, for bundles whose metadata carries no explicit manifest.
    fn scan_storage_entries(&self) -> StorageManifest {
        let mut manifest: StorageManifest = BTreeMap::new();
        for name in self.zip.file_names() {
            let Some(rest) = name.strip_prefix(STORAGE_PREFIX) else {
                continue;
            };
            let Some((bucket, path)) = rest.split_once('/') else {
                continue;
            };
            if path.is_empty() {
                continue;
            }
            manifest
                .entry(bucket.to_string())
                .or_default()
                .push(path.to_string());
        }
        for paths in manifest.values_mut() {
            paths.sort();
        }
        manifest
    }
}

impl ArchiveReader for BundleArchive {
    fn meta(&self) -> &ArchiveMeta {
        &self.meta
    }

    fn dataset(&mut self, table: &str) -> Result<TableDataset> {
        let entry = format!("{TABLES_PREFIX}{table}.json");
        if let Some(bytes) = read_entry(&mut self.zip, &entry)? {
            return serde_json::from_slice(&bytes).map_err(|err| {
                RebakError::ValidationFailed(format!("dataset for {table}: {err}"))
            });
        }
        // Fall back to datasets embedded in the metadata, then to empty.
        match self.meta.tables.get(table) {
            Some(value) => rows_from_value(table, value),
            None => Ok(TableDataset::new()),
        }
    }

    fn manifest(&self) -> StorageManifest {
        let declared = self.meta.manifest();
        if !declared.is_empty() {
            return declared;
        }
        self.scan_storage_entries()
    }

    fn fetch_blob(&mut self, bucket: &str, path: &str) -> Result<Vec<u8>> {
        let entry = format!("{STORAGE_PREFIX}{bucket}/{path}");
        read_entry(&mut self.zip, &entry)?
            .ok_or_else(|| RebakError::NotFound(format!("bundle entry {entry}")))
    }
}

/// Read one entry fully, distinguishing absent from unreadable.
fn read_entry(zip: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> Result<Option<Vec<u8>>> {
    let mut file = match zip.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let mut bytes = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}
