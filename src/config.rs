//! Engine configuration.
//!
//! The canonical table order, bucket allow-list, and declared foreign keys
//! are versioned configuration injected at construction time, defaulting to
//! the values in [`crate::catalog`]. A deployment that extends the live
//! schema overrides them in its config file without touching restore logic.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::error::{RebakError, Result};

/// Rows per upsert batch when none is configured.
pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Rows per upsert batch. Each batch commits independently.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Dependency-ordered table sequence (parents before children).
    #[serde(default = "catalog::canonical_table_order")]
    pub table_order: Vec<String>,

    /// Known live storage buckets.
    #[serde(default = "catalog::bucket_allowlist")]
    pub buckets: Vec<String>,

    /// Declared (parent, child) foreign-key pairs, used only to validate
    /// that `table_order` is a topological order.
    #[serde(default = "catalog::foreign_key_pairs")]
    pub foreign_keys: Vec<(String, String)>,

    /// Tokens granted admin access by the static access guard. Empty means
    /// the gate is open, for local single-user use.
    #[serde(default)]
    pub admin_tokens: Vec<String>,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            table_order: catalog::canonical_table_order(),
            buckets: catalog::bucket_allowlist(),
            foreign_keys: catalog::foreign_key_pairs(),
            admin_tokens: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Load configuration.
    ///
    /// Resolution order: explicit path, then `REBAK_CONFIG`, then the global
    /// config file (`<config dir>/rebak/config.toml`). A missing file at the
    /// fallback locations is fine; an explicit path must exist.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("REBAK_CONFIG").ok().map(PathBuf::from));

        let config = if let Some(path) = explicit {
            Self::load_file(&path)?
        } else {
            match Self::global_path() {
                Some(path) if path.exists() => Self::load_file(&path)?,
                _ => Self::default(),
            }
        };

        config.validate()?;
        Ok(config)
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|err| RebakError::Config(format!("read {}: {err}", path.display())))?;
        toml::from_str(&content)
            .map_err(|err| RebakError::Config(format!("parse {}: {err}", path.display())))
    }

    fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rebak").join("config.toml"))
    }

    /// Validate internal consistency.
    ///
    /// The table order must be duplicate-free and must place every declared
    /// parent before its child; the batch size must be non-zero.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(RebakError::Config("batch_size must be non-zero".into()));
        }

        let mut seen = std::collections::HashSet::new();
        for table in &self.table_order {
            if !seen.insert(table.as_str()) {
                return Err(RebakError::Config(format!(
                    "duplicate table in order: {table}"
                )));
            }
        }

        let position = |t: &str| self.table_order.iter().position(|x| x == t);
        for (parent, child) in &self.foreign_keys {
            match (position(parent), position(child)) {
                (Some(p), Some(c)) if p < c => {}
                (Some(_), Some(_)) => {
                    return Err(RebakError::Config(format!(
                        "table order violates foreign key {parent} -> {child}"
                    )));
                }
                _ => {
                    return Err(RebakError::Config(format!(
                        "foreign key references unknown table: {parent} -> {child}"
                    )));
                }
            }
        }

        Ok(())
    }
}
