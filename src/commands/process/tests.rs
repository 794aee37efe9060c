use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;

use super::db_setup::*;
use super::outputs::write_outputs;
use super::run::{collect_warnings, manifest_path_for, render_process_command, run};
use crate::cli::ProcessArgs;
use crate::ledger::{MasterAddressEntry, PipelineOptions, PipelineOutput, RawRow, run_pipeline};
use crate::model::RunManifest;

const LEDGER_CSV: &str = "\
\"1987 Co-chairs, Jane Smith and John Doe\"
\"123 Main St. [Smith House] - Jane Doe\"
\"45 Oak Ave., #3 - Bob Ray\"
Tour B
\"9 Pine St. - Cal Fox\"
\"1990 Chair, Mr. & Mrs. John (Mary) Smith [Cancelled]\"
";

const REGISTRY_CSV: &str = "\
AddressId,AddressLabel
M-123,123 W Main St
O-45,45 Oak Ave
";

fn sample_output(with_registry: bool) -> PipelineOutput {
    let rows: Vec<RawRow> = [
        "12 Elm St. - Stray",
        "1987 Co-chairs, Jane Smith and John Doe",
        "123 Main St. [Smith House] - Jane Doe",
        "Garden walk - Dee Fox",
        "1990 Chair, Ann Lee",
    ]
    .iter()
    .enumerate()
    .map(|(index, text)| RawRow::new(index, *text))
    .collect();

    let registry = vec![MasterAddressEntry {
        address_label: "123 W Main St".to_string(),
        address_id: "M-123".to_string(),
    }];

    run_pipeline(
        &rows,
        with_registry.then_some(registry.as_slice()),
        &PipelineOptions::default(),
    )
    .expect("pipeline should build")
}

fn process_args(input: PathBuf, output_dir: PathBuf) -> ProcessArgs {
    ProcessArgs {
        input,
        text_column: None,
        skip_rows: 0,
        registry: None,
        match_threshold: 90.0,
        output_dir,
        db_path: None,
        manifest_path: None,
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("csv should be readable")
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn export_run_replaces_previous_rows() {
    let mut connection = Connection::open_in_memory().expect("in-memory db should open");
    ensure_schema(&connection).expect("schema should be created");

    let output = sample_output(true);
    let first = export_run(&mut connection, "run-1", &output).expect("export should succeed");
    let second = export_run(&mut connection, "run-2", &output).expect("export should succeed");
    assert_eq!(first, second);
    assert_eq!(first.ledger_rows, 3);
    assert_eq!(first.rejects, 1);
    assert_eq!(first.address_matches, 1);

    let ledger_rows = count_rows(&connection, "SELECT COUNT(*) FROM ledger").expect("count");
    assert_eq!(ledger_rows, 3);
    let stale = count_rows(&connection, "SELECT COUNT(*) FROM ledger WHERE run_id = 'run-1'")
        .expect("count");
    assert_eq!(stale, 0);

    let matched = count_rows(
        &connection,
        "SELECT COUNT(*) FROM address_matches WHERE status = 'matched'",
    )
    .expect("count");
    assert_eq!(matched, 1);

    let reason: String = connection
        .query_row("SELECT reason FROM rejects", [], |row| row.get(0))
        .expect("reject row should exist");
    assert_eq!(reason, "no_group_context");

    assert_eq!(
        metadata_value(&connection, "db_schema_version").expect("metadata"),
        Some(DB_SCHEMA_VERSION.to_string())
    );
    assert_eq!(
        metadata_value(&connection, "last_run_id").expect("metadata"),
        Some("run-2".to_string())
    );
    assert!(
        metadata_value(&connection, "db_updated_at")
            .expect("metadata")
            .is_some()
    );
}

#[test]
fn placeholder_rows_are_exported_with_empty_address_columns() {
    let mut connection = Connection::open_in_memory().expect("in-memory db should open");
    ensure_schema(&connection).expect("schema should be created");
    export_run(&mut connection, "run-1", &sample_output(false)).expect("export should succeed");

    let (chair1, address, host): (String, String, Option<String>) = connection
        .query_row(
            "SELECT chair1, address, host_name FROM ledger WHERE placeholder = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .expect("placeholder row should exist");
    assert_eq!(chair1, "Ann Lee");
    assert_eq!(address, "");
    assert_eq!(host, None);

    let matches = count_rows(&connection, "SELECT COUNT(*) FROM address_matches").expect("count");
    assert_eq!(matches, 0);
}

#[test]
fn write_outputs_emits_tables_with_headers() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let paths = write_outputs(dir.path(), &sample_output(false)).expect("outputs should write");

    let ledger = read_lines(Path::new(&paths.ledger_csv));
    assert_eq!(
        ledger[0],
        "year,chair1,chair1_first_name,chair1_last_name,chair2,chair2_first_name,\
         chair2_last_name,tour,notes,address,unit_number,place_name,host_name,\
         street_number,street_name,street_type,clean_address"
    );
    assert_eq!(ledger.len(), 4);
    assert!(ledger[1].starts_with("1987,Jane Smith,Jane,Smith,John Doe,John,Doe,A,"));
    assert!(ledger[1].ends_with("123,W. Main,St.,123 W. Main St."));

    let rejects = read_lines(Path::new(&paths.rejects_csv));
    assert_eq!(rejects, vec!["ordinal,text,reason", "0,12 Elm St. - Stray,no_group_context"]);

    assert!(paths.matched_csv.is_none());
    assert!(!dir.path().join("matched.csv").exists());
}

#[test]
fn write_outputs_includes_linkage_tables_when_linked() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let paths = write_outputs(dir.path(), &sample_output(true)).expect("outputs should write");

    let matched = read_lines(Path::new(
        paths.matched_csv.as_deref().expect("matched table should be written"),
    ));
    assert_eq!(matched[0], "unmatched_address,matched_address,matched_id,score");
    assert_eq!(matched[1], "123 W. Main St.,123 W Main St,M-123,100.0");

    let unmatched = read_lines(Path::new(
        paths.unmatched_csv.as_deref().expect("unmatched table should be written"),
    ));
    assert_eq!(unmatched.len(), 1);
}

#[test]
fn warnings_summarize_rejects_and_unparsed_addresses() {
    let output = sample_output(false);
    let warnings = collect_warnings(&output, None);
    assert_eq!(
        warnings,
        vec![
            "1 ledger rows rejected; see rejects.csv".to_string(),
            "1 of 2 entries have no parseable street address".to_string(),
        ]
    );

    let empty_registry = collect_warnings(&output, Some(0));
    assert!(empty_registry.iter().any(|warning| warning.contains("registry is empty")));
}

#[test]
fn render_process_command_lists_supplied_flags() {
    let mut args = process_args(PathBuf::from("ledger.csv"), PathBuf::from("out"));
    args.registry = Some(PathBuf::from("registry.csv"));
    args.skip_rows = 2;

    assert_eq!(
        render_process_command(&args),
        "tour-ledger process --input ledger.csv --skip-rows 2 --registry registry.csv \
         --match-threshold 90 --output-dir out"
    );
    assert_eq!(manifest_path_for(&args), PathBuf::from("out").join("run_manifest.json"));
}

#[test]
fn run_writes_tables_database_and_manifest() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let input = dir.path().join("ledger.csv");
    let registry = dir.path().join("registry.csv");
    fs::write(&input, LEDGER_CSV).expect("ledger should write");
    fs::write(&registry, REGISTRY_CSV).expect("registry should write");

    let output_dir = dir.path().join("out");
    let db_path = output_dir.join("ledger.sqlite");
    let mut args = process_args(input, output_dir.clone());
    args.registry = Some(registry);
    args.db_path = Some(db_path.clone());

    run(args.clone()).expect("process should succeed");

    let raw = fs::read(manifest_path_for(&args)).expect("manifest should exist");
    let manifest: RunManifest = serde_json::from_slice(&raw).expect("manifest should parse");
    assert_eq!(manifest.status, "completed");
    assert!(manifest.run_id.starts_with("run-"));
    assert_eq!(manifest.counts.input_rows, 6);
    assert_eq!(manifest.counts.content_rows, 3);
    assert_eq!(manifest.counts.placeholder_rows, 1);
    assert_eq!(manifest.counts.matched_addresses, 2);
    assert_eq!(manifest.counts.unmatched_addresses, 1);
    assert_eq!(manifest.source_hashes.input.sha256.len(), 64);
    assert!(manifest.source_hashes.registry.is_some());
    assert_eq!(manifest.db_schema_version.as_deref(), Some(DB_SCHEMA_VERSION));

    assert!(output_dir.join("ledger.csv").exists());
    assert!(output_dir.join("matched.csv").exists());
    assert!(output_dir.join("unmatched.csv").exists());
    assert!(output_dir.join("rejects.csv").exists());

    let connection = Connection::open(&db_path).expect("export db should open");
    let ledger_rows = count_rows(&connection, "SELECT COUNT(*) FROM ledger").expect("count");
    assert_eq!(ledger_rows, 4);
}

#[test]
fn run_rejects_out_of_range_threshold() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let mut args = process_args(dir.path().join("ledger.csv"), dir.path().join("out"));
    args.match_threshold = 120.0;

    let err = run(args).expect_err("threshold above 100 should fail");
    assert!(err.to_string().contains("match-threshold"));
}
