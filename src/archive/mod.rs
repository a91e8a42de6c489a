//! Captured archives: metadata, the reader seam, and the two input modes.
//!
//! An archive is either referenced by a path into the content store
//! ([`reference::ReferenceArchive`]) or supplied as uploaded bundle bytes
//! ([`bundle::BundleArchive`]). Both expose per-table datasets and a storage
//! manifest through [`ArchiveReader`].

pub mod builder;
pub mod bundle;
pub mod reference;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RebakError, Result};

/// Bucket name to the relative file paths captured in that bucket.
pub type StorageManifest = BTreeMap<String, Vec<String>>;

/// Ordered row documents for one table.
pub type TableDataset = Vec<Value>;

/// Metadata entry name inside a bundle.
pub const METADATA_ENTRY: &str = "backup.json";

/// Archive format, detected via the metadata `version` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Early flat captures: table data only, no storage manifest.
    Flat,
    /// Versioned captures carrying a storage manifest and a per-capture
    /// storage prefix for resolving blob paths in the content store.
    Versioned,
}

/// Parsed archive metadata object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveMeta {
    /// Format version; absent or 1 means flat, 2 means versioned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub table_count: u64,

    #[serde(default)]
    pub file_count: u64,

    /// Prefix under which this capture's blobs live in the content store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_prefix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_manifest: Option<StorageManifest>,

    /// Bundle checksum written by the builder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,

    /// Table datasets embedded in the metadata object. Kept as raw values
    /// so one malformed table fails alone, not the whole archive.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tables: BTreeMap<String, Value>,
}

impl ArchiveMeta {
    #[must_use]
    pub fn format(&self) -> ArchiveFormat {
        match self.version.unwrap_or(1) {
            0 | 1 => ArchiveFormat::Flat,
            _ => ArchiveFormat::Versioned,
        }
    }

    /// Reject versions this engine does not understand.
    pub fn check_supported(&self) -> Result<()> {
        match self.version.unwrap_or(1) {
            0 | 1 | 2 => Ok(()),
            other => Err(RebakError::ArchiveUnreadable(format!(
                "unsupported archive version {other}"
            ))),
        }
    }

    /// The storage manifest, empty for flat captures.
    #[must_use]
    pub fn manifest(&self) -> StorageManifest {
        match self.format() {
            ArchiveFormat::Flat => StorageManifest::new(),
            ArchiveFormat::Versioned => self.storage_manifest.clone().unwrap_or_default(),
        }
    }
}

/// Read access to one archive, whichever mode supplied it.
///
/// `dataset` and `fetch_blob` take `&mut self` because bundle entries are
/// read through a seekable zip handle.
pub trait ArchiveReader {
    fn meta(&self) -> &ArchiveMeta;

    /// The rows for one table. Missing tables yield an empty dataset; a
    /// present-but-malformed dataset is an error the caller records against
    /// that table alone.
    fn dataset(&mut self, table: &str) -> Result<TableDataset>;

    /// Bucket to captured file paths.
    fn manifest(&self) -> StorageManifest;

    /// Fetch one captured blob's bytes.
    fn fetch_blob(&mut self, bucket: &str, path: &str) -> Result<Vec<u8>>;
}

/// Decode an embedded dataset value into rows.
pub(crate) fn rows_from_value(table: &str, value: &Value) -> Result<TableDataset> {
    match value {
        Value::Array(rows) => Ok(rows.clone()),
        _ => Err(RebakError::ValidationFailed(format!(
            "dataset for {table} is not an array"
        ))),
    }
}
