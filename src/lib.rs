//! rebak - backup/restore engine for workspace archives.
//!
//! Consumes a captured archive of a multi-table relational dataset plus blob
//! storage (either by reference into a content store or as an uploaded
//! bundle) and replays it into live state: tables in a fixed dependency
//! order with batched upserts, then blob files back to their original
//! bucket paths. The export direction packs a captured archive into a single
//! downloadable bundle.

pub mod access;
pub mod archive;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod mime;
pub mod store;

pub use error::{RebakError, Result};

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
