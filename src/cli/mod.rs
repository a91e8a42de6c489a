//! Command-line interface definitions (clap v4 derive).

pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// rebak - restore and export workspace backups
#[derive(Parser, Debug)]
#[command(name = "rebak")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Emit machine-readable JSON output
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: ~/.config/rebak/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Access token presented to the access guard
    #[arg(long, global = true, env = "REBAK_TOKEN")]
    pub token: Option<String>,

    /// Root directory for live state (database plus bucket storage)
    #[arg(long, global = true, env = "REBAK_DATA_ROOT", default_value = "data")]
    pub data_root: PathBuf,

    /// Root directory of the content store holding captured archives
    #[arg(long, global = true, env = "REBAK_STORE_ROOT", default_value = "archive-store")]
    pub store_root: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Restore live state from a captured archive
    Restore(RestoreArgs),
    /// Export a captured archive as a downloadable bundle
    Export(ExportArgs),
}

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Reference path of the archive metadata in the content store
    pub reference: Option<String>,

    /// Restore from an uploaded bundle file instead of a store reference
    #[arg(long, conflicts_with = "reference")]
    pub bundle: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Reference path of the archive metadata in the content store
    pub reference: String,

    /// Directory to write the bundle into (default: current directory)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}
