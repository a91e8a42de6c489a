//! Dependency-ordered table restorer.
//!
//! Replays datasets strictly in the configured canonical order, batched and
//! upserting. Every failure is scoped to its unit: a bad batch records an
//! error against its table and the run moves on.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::archive::ArchiveReader;
use crate::engine::report::TableOutcome;
use crate::store::LiveStore;

pub struct TableRestorer<'a> {
    live: &'a mut LiveStore,
    order: &'a [String],
    batch_size: usize,
}

impl<'a> TableRestorer<'a> {
    pub fn new(live: &'a mut LiveStore, order: &'a [String], batch_size: usize) -> Self {
        Self {
            live,
            order,
            batch_size,
        }
    }

    /// Restore every table in canonical order. The result always contains an
    /// entry per known table; tables absent from the archive report
    /// `{restored: 0, errors: []}`.
    pub fn run(&mut self, archive: &mut dyn ArchiveReader) -> BTreeMap<String, TableOutcome> {
        let mut details = BTreeMap::new();

        for table in self.order {
            let mut outcome = TableOutcome::default();

            match archive.dataset(table) {
                Ok(rows) if rows.is_empty() => {}
                Ok(rows) => {
                    for (index, batch) in rows.chunks(self.batch_size).enumerate() {
                        match self.live.upsert_batch(table, batch) {
                            Ok(written) => outcome.restored += written as u64,
                            Err(err) => {
                                warn!(table, batch = index, %err, "batch failed");
                                outcome.errors.push(format!("batch {index}: {err}"));
                            }
                        }
                    }
                    debug!(
                        table,
                        restored = outcome.restored,
                        errors = outcome.errors.len(),
                        "table restored"
                    );
                }
                Err(err) => {
                    warn!(table, %err, "dataset unreadable");
                    outcome.errors.push(format!("dataset: {err}"));
                }
            }

            details.insert(table.clone(), outcome);
        }

        details
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveMeta, StorageManifest, TableDataset};
    use crate::error::{RebakError, Result};
    use serde_json::json;
    use std::collections::BTreeMap as Map;

    struct FakeArchive {
        meta: ArchiveMeta,
        tables: Map<String, Result<TableDataset>>,
    }

    impl FakeArchive {
        fn new(tables: Map<String, Result<TableDataset>>) -> Self {
            let meta = serde_json::from_value(json!({
                "version": 2,
                "created_at": "2026-03-01T12:00:00Z",
            }))
            .unwrap();
            Self { meta, tables }
        }
    }

    impl ArchiveReader for FakeArchive {
        fn meta(&self) -> &ArchiveMeta {
            &self.meta
        }

        fn dataset(&mut self, table: &str) -> Result<TableDataset> {
            match self.tables.get(table) {
                Some(Ok(rows)) => Ok(rows.clone()),
                Some(Err(_)) => Err(RebakError::ValidationFailed(format!(
                    "dataset for {table} is not an array"
                ))),
                None => Ok(TableDataset::new()),
            }
        }

        fn manifest(&self) -> StorageManifest {
            StorageManifest::new()
        }

        fn fetch_blob(&mut self, _bucket: &str, _path: &str) -> Result<Vec<u8>> {
            Err(RebakError::NotFound("no blobs".into()))
        }
    }

    fn rows(prefix: &str, n: usize) -> TableDataset {
        (0..n).map(|i| json!({"id": format!("{prefix}-{i:04}")})).collect()
    }

    fn order(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn concrete_scenario_batches_and_zero_results() {
        let mut live = LiveStore::open_in_memory().unwrap();
        let order = order(&["organizations", "profiles", "documents"]);
        let mut archive = FakeArchive::new(Map::from([
            ("organizations".to_string(), Ok(rows("org", 3))),
            ("profiles".to_string(), Ok(rows("p", 250))),
        ]));

        let details = TableRestorer::new(&mut live, &order, 100).run(&mut archive);

        assert_eq!(details["organizations"].restored, 3);
        assert_eq!(details["profiles"].restored, 250);
        assert_eq!(details["documents"].restored, 0);
        assert!(details["documents"].errors.is_empty());
        assert_eq!(live.row_count("profiles").unwrap(), 250);
    }

    #[test]
    fn batch_failure_is_isolated_to_its_batch() {
        let mut live = LiveStore::open_in_memory().unwrap();
        let order = order(&["profiles"]);

        // 101 rows: batch 0 is full and clean, batch 1 holds the bad row.
        let mut dataset = rows("p", 100);
        dataset.push(json!({"no_id": true}));
        let mut archive =
            FakeArchive::new(Map::from([("profiles".to_string(), Ok(dataset))]));

        let details = TableRestorer::new(&mut live, &order, 100).run(&mut archive);

        let outcome = &details["profiles"];
        assert_eq!(outcome.restored, 100);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].starts_with("batch 1:"));
    }

    #[test]
    fn unreadable_dataset_does_not_halt_other_tables() {
        let mut live = LiveStore::open_in_memory().unwrap();
        let order = order(&["organizations", "documents", "tasks"]);
        let mut archive = FakeArchive::new(Map::from([
            ("organizations".to_string(), Ok(rows("org", 2))),
            (
                "documents".to_string(),
                Err(RebakError::ValidationFailed("x".into())),
            ),
            ("tasks".to_string(), Ok(rows("t", 5))),
        ]));

        let details = TableRestorer::new(&mut live, &order, 100).run(&mut archive);

        assert_eq!(details["organizations"].restored, 2);
        assert_eq!(details["documents"].restored, 0);
        assert_eq!(details["documents"].errors.len(), 1);
        assert_eq!(details["tasks"].restored, 5);
    }

    #[test]
    fn replay_converges_to_same_identifier_set() {
        let mut live = LiveStore::open_in_memory().unwrap();
        let order = order(&["organizations"]);
        let mut archive = FakeArchive::new(Map::from([(
            "organizations".to_string(),
            Ok(rows("org", 7)),
        )]));

        TableRestorer::new(&mut live, &order, 3).run(&mut archive);
        let first = live.row_ids("organizations").unwrap();
        TableRestorer::new(&mut live, &order, 3).run(&mut archive);
        let second = live.row_ids("organizations").unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 7);
    }
}
