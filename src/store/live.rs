//! Live relational store.
//!
//! The engine is schema-agnostic: every table holds opaque JSON row
//! documents keyed on their `id` field. Replaying a batch is one SQLite
//! transaction, so a failed batch rolls back alone and never poisons its
//! table or its neighbours.

use std::path::Path;

use rusqlite::{params, Connection};
use serde_json::Value;

use crate::error::{RebakError, Result};

/// SQLite-backed live store for restored table rows.
pub struct LiveStore {
    conn: Connection,
}

impl std::fmt::Debug for LiveStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveStore").finish_non_exhaustive()
    }
}

impl LiveStore {
    /// Open the live database, creating parent directories as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "busy_timeout", 5000)?;
        Ok(Self { conn })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Upsert one batch of rows into `table`, keyed on each row's `id`.
    ///
    /// The whole batch is a single transaction: any bad row (missing `id`,
    /// non-scalar `id`) or SQL failure rolls the batch back and returns the
    /// error for the caller to record. Returns the number of rows written.
    pub fn upsert_batch(&mut self, table: &str, rows: &[Value]) -> Result<usize> {
        validate_table_name(table)?;
        self.ensure_table(table)?;

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO \"{table}\" (id, doc) VALUES (?, ?)
                 ON CONFLICT(id) DO UPDATE SET doc=excluded.doc"
            ))?;
            for row in rows {
                let id = row_id(row)?;
                stmt.execute(params![id, row.to_string()])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// Number of rows currently in `table` (0 if it was never created).
    pub fn row_count(&self, table: &str) -> Result<u64> {
        validate_table_name(table)?;
        if !self.table_exists(table)? {
            return Ok(0);
        }
        let count: u64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM \"{table}\""),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Sorted primary identifiers in `table`, for idempotence checks.
    pub fn row_ids(&self, table: &str) -> Result<Vec<String>> {
        validate_table_name(table)?;
        if !self.table_exists(table)? {
            return Ok(Vec::new());
        }
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT id FROM \"{table}\" ORDER BY id"))?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Fetch one row document by id.
    pub fn get_row(&self, table: &str, id: &str) -> Result<Option<Value>> {
        validate_table_name(table)?;
        if !self.table_exists(table)? {
            return Ok(None);
        }
        let doc: Option<String> = self
            .conn
            .query_row(
                &format!("SELECT doc FROM \"{table}\" WHERE id = ?"),
                params![id],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        match doc {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    fn ensure_table(&self, table: &str) -> Result<()> {
        self.conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS \"{table}\" (
                    id  TEXT PRIMARY KEY,
                    doc TEXT NOT NULL
                )"
            ),
            [],
        )?;
        Ok(())
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        let count: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
            params![table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

/// Extract the primary identifier from a row document.
fn row_id(row: &Value) -> Result<String> {
    match row.get("id") {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(RebakError::ValidationFailed(
            "row missing primary identifier".into(),
        )),
    }
}

/// Table names come from the configured closed set, but quote-and-check
/// anyway so a bad config cannot smuggle SQL.
fn validate_table_name(table: &str) -> Result<()> {
    let ok = !table.is_empty()
        && table
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if ok {
        Ok(())
    } else {
        Err(RebakError::ValidationFailed(format!(
            "invalid table name: {table}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn upsert_is_idempotent() {
        let mut store = LiveStore::open_in_memory().unwrap();
        let rows = vec![
            json!({"id": "a", "name": "first"}),
            json!({"id": "b", "name": "second"}),
        ];

        store.upsert_batch("organizations", &rows).unwrap();
        store.upsert_batch("organizations", &rows).unwrap();

        assert_eq!(store.row_count("organizations").unwrap(), 2);
        assert_eq!(store.row_ids("organizations").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn conflict_overwrites_document() {
        let mut store = LiveStore::open_in_memory().unwrap();
        store
            .upsert_batch("profiles", &[json!({"id": "p1", "name": "old"})])
            .unwrap();
        store
            .upsert_batch("profiles", &[json!({"id": "p1", "name": "new"})])
            .unwrap();

        let row = store.get_row("profiles", "p1").unwrap().unwrap();
        assert_eq!(row["name"], "new");
        assert_eq!(store.row_count("profiles").unwrap(), 1);
    }

    #[test]
    fn numeric_ids_are_accepted() {
        let mut store = LiveStore::open_in_memory().unwrap();
        store
            .upsert_batch("tasks", &[json!({"id": 42, "title": "t"})])
            .unwrap();
        assert_eq!(store.row_ids("tasks").unwrap(), vec!["42"]);
    }

    #[test]
    fn row_without_id_fails_whole_batch() {
        let mut store = LiveStore::open_in_memory().unwrap();
        let rows = vec![json!({"id": "ok"}), json!({"name": "no id"})];

        let err = store.upsert_batch("documents", &rows).unwrap_err();
        assert!(err.to_string().contains("primary identifier"));
        // Transaction rolled back: the good row is gone too.
        assert_eq!(store.row_count("documents").unwrap(), 0);
    }

    #[test]
    fn rejects_suspect_table_names() {
        let mut store = LiveStore::open_in_memory().unwrap();
        let rows = vec![json!({"id": "a"})];
        assert!(store.upsert_batch("bad-name", &rows).is_err());
        assert!(store.upsert_batch("drop table\"", &rows).is_err());
        assert!(store.upsert_batch("", &rows).is_err());
    }

    #[test]
    fn unknown_table_counts_as_empty() {
        let store = LiveStore::open_in_memory().unwrap();
        assert_eq!(store.row_count("never_written").unwrap(), 0);
        assert!(store.row_ids("never_written").unwrap().is_empty());
    }
}
