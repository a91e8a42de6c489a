//! Error handling for rebak.
//!
//! Only fatal, run-level failures surface as [`RebakError`]: an archive that
//! cannot be opened, an unauthorized caller, a malformed request, a held run
//! lock. Unit-level failures (a single batch upsert, a single file fetch)
//! are recorded inside the restore report and never become `Err`.

use std::io;

use thiserror::Error;

/// Main error type for rebak operations.
#[derive(Error, Debug)]
pub enum RebakError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Bundle error: {0}")]
    Bundle(#[from] zip::result::ZipError),

    #[error("Archive unreadable: {0}")]
    ArchiveUnreadable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Lock failed: {0}")]
    LockFailed(String),
}

impl RebakError {
    /// Whether this error means the caller was rejected before the run
    /// started, as opposed to the run itself failing.
    #[must_use]
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

/// Result type alias using RebakError.
pub type Result<T> = std::result::Result<T, RebakError>;
