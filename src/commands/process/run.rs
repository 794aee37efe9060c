use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use rusqlite::Connection;
use tracing::{info, warn};

use super::db_setup::{DB_SCHEMA_VERSION, configure_connection, ensure_schema, export_run};
use super::outputs::write_outputs;
use crate::cli::ProcessArgs;
use crate::ledger::{PipelineOptions, PipelineOutput, run_pipeline};
use crate::model::{ProcessSettings, RunManifest, SourceHash, SourceHashes};
use crate::source::{RowSourceOptions, load_registry, load_rows};
use crate::util::{
    ensure_directory, now_utc_string, sha256_file, utc_compact_string, write_json_pretty,
};

pub const MANIFEST_FILE_NAME: &str = "run_manifest.json";

pub fn run(args: ProcessArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    if !(0.0..=100.0).contains(&args.match_threshold) {
        bail!(
            "--match-threshold must be between 0 and 100, got {}",
            args.match_threshold
        );
    }

    info!(
        input = %args.input.display(),
        output_dir = %args.output_dir.display(),
        run_id = %run_id,
        "starting ledger processing"
    );

    let rows = load_rows(
        &args.input,
        &RowSourceOptions {
            text_column: args.text_column.clone(),
            skip_rows: args.skip_rows,
        },
    )?;

    let registry = args
        .registry
        .as_deref()
        .map(load_registry)
        .transpose()?;
    if registry.is_none() {
        info!("no registry supplied; address linkage skipped");
    }

    let options = PipelineOptions {
        match_threshold: args.match_threshold,
    };
    let output = run_pipeline(&rows, registry.as_deref(), &options)?;

    let mut paths = write_outputs(&args.output_dir, &output)?;

    let db_schema_version = match &args.db_path {
        Some(db_path) => {
            export_to_db(db_path, &run_id, &output)?;
            paths.db_path = Some(db_path.display().to_string());
            Some(DB_SCHEMA_VERSION.to_string())
        }
        None => None,
    };

    let source_hashes = SourceHashes {
        input: hash_source(&args.input)?,
        registry: args.registry.as_deref().map(hash_source).transpose()?,
    };

    let warnings = collect_warnings(&output, registry.as_deref().map(<[_]>::len));
    for warning in &warnings {
        warn!(warning = %warning, "run warning");
    }

    let manifest = RunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        db_schema_version,
        status: "completed".to_string(),
        started_at,
        completed_at: now_utc_string(),
        command: render_process_command(&args),
        settings: ProcessSettings {
            text_column: args.text_column.clone(),
            skip_rows: args.skip_rows,
            match_threshold: args.match_threshold,
        },
        source_hashes,
        paths,
        counts: output.stats.clone(),
        warnings,
    };

    let manifest_path = manifest_path_for(&args);
    write_json_pretty(&manifest_path, &manifest)?;

    info!(path = %manifest_path.display(), "wrote run manifest");
    info!(
        run_id = %run_id,
        records = output.records.len(),
        rejects = output.rejects.len(),
        "ledger processing completed"
    );

    Ok(())
}

pub(super) fn manifest_path_for(args: &ProcessArgs) -> PathBuf {
    args.manifest_path
        .clone()
        .unwrap_or_else(|| args.output_dir.join(MANIFEST_FILE_NAME))
}

fn export_to_db(db_path: &Path, run_id: &str, output: &PipelineOutput) -> Result<()> {
    if let Some(parent) = db_path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        ensure_directory(parent)?;
    }

    let mut connection = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;
    export_run(&mut connection, run_id, output)?;

    info!(path = %db_path.display(), "updated sqlite export");
    Ok(())
}

fn hash_source(path: &Path) -> Result<SourceHash> {
    Ok(SourceHash {
        path: path.display().to_string(),
        sha256: sha256_file(path)?,
    })
}

pub(super) fn collect_warnings(output: &PipelineOutput, registry_len: Option<usize>) -> Vec<String> {
    let mut warnings = Vec::new();
    let stats = &output.stats;

    if stats.groups == 0 {
        warnings.push("no group headers found in ledger input".to_string());
    }
    if stats.rejected_rows > 0 {
        warnings.push(format!(
            "{} ledger rows rejected; see rejects.csv",
            stats.rejected_rows
        ));
    }
    if stats.unparsed_addresses > 0 {
        warnings.push(format!(
            "{} of {} entries have no parseable street address",
            stats.unparsed_addresses, stats.content_rows
        ));
    }
    match registry_len {
        Some(0) => warnings.push("address registry is empty; every address is unmatched".to_string()),
        Some(_) if stats.unmatched_addresses > 0 => warnings.push(format!(
            "{} addresses scored below the match threshold",
            stats.unmatched_addresses
        )),
        _ => {}
    }

    warnings
}

pub(super) fn render_process_command(args: &ProcessArgs) -> String {
    let mut command = vec![
        "tour-ledger".to_string(),
        "process".to_string(),
        "--input".to_string(),
        args.input.display().to_string(),
    ];

    if let Some(column) = &args.text_column {
        command.push("--text-column".to_string());
        command.push(column.clone());
    }
    if args.skip_rows > 0 {
        command.push("--skip-rows".to_string());
        command.push(args.skip_rows.to_string());
    }
    if let Some(path) = &args.registry {
        command.push("--registry".to_string());
        command.push(path.display().to_string());
    }
    command.push("--match-threshold".to_string());
    command.push(args.match_threshold.to_string());
    command.push("--output-dir".to_string());
    command.push(args.output_dir.display().to_string());
    if let Some(path) = &args.db_path {
        command.push("--db-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.manifest_path {
        command.push("--manifest-path".to_string());
        command.push(path.display().to_string());
    }

    command.join(" ")
}
