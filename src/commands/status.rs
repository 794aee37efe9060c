use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::process::{MANIFEST_FILE_NAME, count_rows, metadata_value};
use crate::model::RunManifest;

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_path = args.output_dir.join(MANIFEST_FILE_NAME);

    info!(output_dir = %args.output_dir.display(), "status requested");

    let manifest = load_manifest(&manifest_path)?;
    match &manifest {
        Some(manifest) => {
            let counts = &manifest.counts;
            info!(
                run_id = %manifest.run_id,
                status = %manifest.status,
                started_at = %manifest.started_at,
                completed_at = %manifest.completed_at,
                command = %manifest.command,
                input_rows = counts.input_rows,
                content_rows = counts.content_rows,
                placeholders = counts.placeholder_rows,
                rejected = counts.rejected_rows,
                groups = counts.groups,
                unparsed_addresses = counts.unparsed_addresses,
                matched = counts.matched_addresses,
                unmatched = counts.unmatched_addresses,
                warnings = manifest.warnings.len(),
                "loaded run manifest"
            );
        }
        None => warn!(path = %manifest_path.display(), "run manifest missing"),
    }

    for table in ["ledger.csv", "rejects.csv"] {
        let path = args.output_dir.join(table);
        if !path.exists() {
            warn!(path = %path.display(), "output table missing");
        }
    }

    match resolve_db_path(&args, manifest.as_ref()) {
        Some(db_path) if db_path.exists() => report_database(&db_path)?,
        Some(db_path) => warn!(path = %db_path.display(), "database file missing"),
        None => info!("no sqlite export recorded"),
    }

    Ok(())
}

pub fn load_manifest(path: &Path) -> Result<Option<RunManifest>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let manifest = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(manifest))
}

fn resolve_db_path(args: &StatusArgs, manifest: Option<&RunManifest>) -> Option<PathBuf> {
    args.db_path.clone().or_else(|| {
        manifest
            .and_then(|manifest| manifest.paths.db_path.as_ref())
            .map(PathBuf::from)
    })
}

fn report_database(db_path: &Path) -> Result<()> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;

    let ledger_count = count_rows(&conn, "SELECT COUNT(*) FROM ledger").unwrap_or(0);
    let matches_count = count_rows(&conn, "SELECT COUNT(*) FROM address_matches").unwrap_or(0);
    let rejects_count = count_rows(&conn, "SELECT COUNT(*) FROM rejects").unwrap_or(0);
    let schema_version = metadata_value(&conn, "db_schema_version")
        .ok()
        .flatten()
        .unwrap_or_default();
    let updated_at = metadata_value(&conn, "db_updated_at")
        .ok()
        .flatten()
        .unwrap_or_default();

    info!(
        path = %db_path.display(),
        schema_version = %schema_version,
        updated_at = %updated_at,
        ledger = ledger_count,
        address_matches = matches_count,
        rejects = rejects_count,
        "database status"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_artifacts_are_not_errors() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let args = StatusArgs {
            output_dir: dir.path().join("never-written"),
            db_path: Some(dir.path().join("missing.sqlite")),
        };

        run(args).expect("status should tolerate missing artifacts");
        assert!(
            load_manifest(&dir.path().join(MANIFEST_FILE_NAME))
                .expect("missing manifest is not an error")
                .is_none()
        );
    }

    #[test]
    fn corrupt_manifest_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join(MANIFEST_FILE_NAME);
        fs::write(&path, b"{not json").expect("manifest should write");

        let err = load_manifest(&path).expect_err("corrupt manifest should fail");
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn db_path_falls_back_to_manifest_entry() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let input = dir.path().join("ledger.csv");
        fs::write(&input, "\"1990 Chair, Ann Lee\"\n\"1 Elm St. - Host\"\n")
            .expect("ledger should write");
        let output_dir = dir.path().join("out");
        let db_path = output_dir.join("ledger.sqlite");

        crate::commands::process::run(crate::cli::ProcessArgs {
            input,
            text_column: None,
            skip_rows: 0,
            registry: None,
            match_threshold: 90.0,
            output_dir: output_dir.clone(),
            db_path: Some(db_path.clone()),
            manifest_path: None,
        })
        .expect("process should succeed");

        let args = StatusArgs {
            output_dir,
            db_path: None,
        };
        let manifest = load_manifest(&args.output_dir.join(MANIFEST_FILE_NAME))
            .expect("manifest should parse")
            .expect("manifest should exist");
        assert_eq!(resolve_db_path(&args, Some(&manifest)), Some(db_path));

        run(args).expect("status should succeed");
    }
}
