//! Aggregated restore results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-table result: rows written and the unit-level errors recorded along
/// the way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOutcome {
    pub restored: u64,
    pub errors: Vec<String>,
}

/// Per-bucket result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketOutcome {
    pub restored: u64,
    pub errors: u64,
}

/// The run-level report returned to the caller. Serializes to the wire shape
/// consumers expect: totals first, then per-table and per-bucket detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreReport {
    pub success: bool,
    pub total_restored: u64,
    pub total_errors: u64,
    pub files_restored: u64,
    pub file_errors: u64,
    pub db_details: BTreeMap<String, TableOutcome>,
    pub storage_details: BTreeMap<String, BucketOutcome>,
}

impl RestoreReport {
    /// Aggregate phase outputs into the final report. `success` means no
    /// unit-level error was recorded anywhere.
    #[must_use]
    pub fn assemble(
        db_details: BTreeMap<String, TableOutcome>,
        storage_details: BTreeMap<String, BucketOutcome>,
    ) -> Self {
        let total_restored = db_details.values().map(|t| t.restored).sum();
        let total_errors = db_details.values().map(|t| t.errors.len() as u64).sum();
        let files_restored = storage_details.values().map(|b| b.restored).sum();
        let file_errors = storage_details.values().map(|b| b.errors).sum();

        Self {
            success: total_errors == 0 && file_errors == 0,
            total_restored,
            total_errors,
            files_restored,
            file_errors,
            db_details,
            storage_details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_totals_and_success() {
        let mut db = BTreeMap::new();
        db.insert(
            "organizations".to_string(),
            TableOutcome {
                restored: 3,
                errors: vec![],
            },
        );
        db.insert(
            "profiles".to_string(),
            TableOutcome {
                restored: 100,
                errors: vec!["batch 1: boom".to_string()],
            },
        );
        let mut storage = BTreeMap::new();
        storage.insert(
            "avatars".to_string(),
            BucketOutcome {
                restored: 2,
                errors: 1,
            },
        );

        let report = RestoreReport::assemble(db, storage);
        assert!(!report.success);
        assert_eq!(report.total_restored, 103);
        assert_eq!(report.total_errors, 1);
        assert_eq!(report.files_restored, 2);
        assert_eq!(report.file_errors, 1);
    }

    #[test]
    fn clean_run_is_success() {
        let report = RestoreReport::assemble(BTreeMap::new(), BTreeMap::new());
        assert!(report.success);
        assert_eq!(report.total_restored, 0);
    }

    #[test]
    fn wire_shape_has_expected_fields() {
        let report = RestoreReport::assemble(BTreeMap::new(), BTreeMap::new());
        let value = serde_json::to_value(&report).unwrap();
        for key in [
            "success",
            "total_restored",
            "total_errors",
            "files_restored",
            "file_errors",
            "db_details",
            "storage_details",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }
}
