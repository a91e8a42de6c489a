//! Command handlers.

use std::path::Path;

use serde::Serialize;

use crate::access::{require_admin, AccessGuard, StaticTokenGuard};
use crate::cli::{Cli, Commands, ExportArgs, RestoreArgs};
use crate::config::EngineConfig;
use crate::engine::{RestoreEngine, RestoreReport};
use crate::error::{RebakError, Result};
use crate::store::FsContentStore;

pub fn run(cli: &Cli) -> Result<()> {
    let config = EngineConfig::load(cli.config.as_deref())?;

    let guard = StaticTokenGuard::new(config.admin_tokens.clone());
    let caller = guard.authorize(cli.token.as_deref().unwrap_or(""))?;
    require_admin(&caller)?;

    let store = FsContentStore::open(&cli.store_root)?;

    match &cli.command {
        Commands::Restore(args) => {
            let mut engine = RestoreEngine::open(&config, &cli.data_root, &store)?;
            let report = run_restore(&mut engine, args)?;
            print_report(cli, &report)
        }
        Commands::Export(args) => {
            let engine = RestoreEngine::open(&config, &cli.data_root, &store)?;
            run_export(cli, &engine, args)
        }
    }
}

fn run_restore(engine: &mut RestoreEngine<'_>, args: &RestoreArgs) -> Result<RestoreReport> {
    match (&args.reference, &args.bundle) {
        (Some(reference), None) => engine.restore_reference(reference),
        (None, Some(path)) => {
            let bytes = read_bundle(path)?;
            engine.restore_bundle(bytes)
        }
        (None, None) => Err(RebakError::ValidationFailed(
            "restore requires a reference or --bundle".into(),
        )),
        (Some(_), Some(_)) => unreachable!("clap rejects reference with --bundle"),
    }
}

fn read_bundle(path: &Path) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut bytes = Vec::new();
        std::io::Read::read_to_end(&mut std::io::stdin().lock(), &mut bytes)?;
        return Ok(bytes);
    }
    std::fs::read(path)
        .map_err(|err| RebakError::Config(format!("read {}: {err}", path.display())))
}

fn run_export(cli: &Cli, engine: &RestoreEngine<'_>, args: &ExportArgs) -> Result<()> {
    let (filename, bytes) = engine.export(&args.reference)?;
    let out_dir = args.out.clone().unwrap_or_else(|| ".".into());
    std::fs::create_dir_all(&out_dir)
        .map_err(|err| RebakError::Config(format!("create {}: {err}", out_dir.display())))?;
    let out_path = out_dir.join(&filename);
    std::fs::write(&out_path, &bytes)
        .map_err(|err| RebakError::Config(format!("write {}: {err}", out_path.display())))?;

    if cli.json {
        return emit_json(&serde_json::json!({
            "success": true,
            "filename": filename,
            "path": out_path.display().to_string(),
            "bytes": bytes.len(),
        }));
    }
    println!("Bundle written: {}", out_path.display());
    Ok(())
}

fn print_report(cli: &Cli, report: &RestoreReport) -> Result<()> {
    if cli.json {
        return emit_json(report);
    }

    println!(
        "Restore {}",
        if report.success { "succeeded" } else { "completed with errors" }
    );
    println!(
        "Rows restored: {} ({} errors)",
        report.total_restored, report.total_errors
    );
    println!(
        "Files restored: {} ({} errors)",
        report.files_restored, report.file_errors
    );
    for (table, outcome) in &report.db_details {
        if outcome.restored == 0 && outcome.errors.is_empty() {
            continue;
        }
        println!("  {table}: {} rows", outcome.restored);
        for error in &outcome.errors {
            println!("    error: {error}");
        }
    }
    for (bucket, outcome) in &report.storage_details {
        println!(
            "  {bucket}: {} files, {} errors",
            outcome.restored, outcome.errors
        );
    }
    Ok(())
}

fn emit_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
