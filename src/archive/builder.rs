//! Export-direction bundle builder.
//!
//! Packs a previously captured archive (the frozen snapshot in the content
//! store, not current live state) into one downloadable zip.

use std::collections::BTreeMap;
use std::io::{Cursor, Write};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use zip::write::FileOptions;
use zip::CompressionMethod;
use zip::ZipWriter;

use crate::archive::reference::ReferenceArchive;
use crate::archive::{ArchiveReader, StorageManifest, METADATA_ENTRY};
use crate::error::Result;
use crate::store::ContentStore;

/// Build a bundle from the capture at `reference`.
///
/// Returns the deterministic bundle filename and the zip bytes. Manifest
/// entries whose backing bytes cannot be fetched are omitted from the bundle
/// rather than aborting the export.
pub fn build(store: &dyn ContentStore, reference: &str) -> Result<(String, Vec<u8>)> {
    let mut archive = ReferenceArchive::open(store, reference)?;
    let meta = archive.meta().clone();

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut hasher = Sha256::new();

    let table_names: Vec<String> = meta.tables.keys().cloned().collect();
    let mut table_count = 0u64;
    for table in &table_names {
        let rows = match archive.dataset(table) {
            Ok(rows) => rows,
            Err(err) => {
                warn!(table, %err, "skipping malformed dataset during export");
                continue;
            }
        };
        if rows.is_empty() {
            continue;
        }
        let entry = format!("tables/{table}.json");
        let bytes = serde_json::to_vec(&rows)?;
        hasher.update(entry.as_bytes());
        hasher.update(&bytes);
        zip.start_file(&entry, opts)?;
        zip.write_all(&bytes)?;
        table_count += 1;
    }

    let manifest = archive.manifest();
    let mut kept: StorageManifest = BTreeMap::new();
    let mut file_count = 0u64;
    for (bucket, paths) in &manifest {
        for path in paths {
            let bytes = match archive.fetch_blob(bucket, path) {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(bucket, path, %err, "omitting unfetchable blob from bundle");
                    continue;
                }
            };
            let entry = format!("storage/{bucket}/{path}");
            hasher.update(entry.as_bytes());
            hasher.update(&bytes);
            zip.start_file(&entry, opts)?;
            zip.write_all(&bytes)?;
            kept.entry(bucket.clone()).or_default().push(path.clone());
            file_count += 1;
        }
    }

    let mut bundle_meta = meta.clone();
    bundle_meta.tables = BTreeMap::new();
    bundle_meta.table_count = table_count;
    bundle_meta.file_count = file_count;
    bundle_meta.storage_manifest = if kept.is_empty() { None } else { Some(kept) };
    bundle_meta.checksum = Some(format!("sha256:{}", hex::encode(hasher.finalize())));

    zip.start_file(METADATA_ENTRY, opts)?;
    zip.write_all(&serde_json::to_vec_pretty(&bundle_meta)?)?;

    let bytes = zip.finish()?.into_inner();
    let filename = bundle_filename(meta.created_at);
    debug!(filename, tables = table_count, files = file_count, "bundle built");
    Ok((filename, bytes))
}

/// Deterministic bundle filename derived from the capture timestamp.
#[must_use]
pub fn bundle_filename(created_at: DateTime<Utc>) -> String {
    format!("backup-{}.zip", created_at.format("%Y%m%d%H%M%S"))
}
