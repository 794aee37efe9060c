use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::ledger::PipelineOutput;
use crate::model::OutputPaths;
use crate::util::ensure_directory;

const LEDGER_COLUMNS: [&str; 17] = [
    "year",
    "chair1",
    "chair1_first_name",
    "chair1_last_name",
    "chair2",
    "chair2_first_name",
    "chair2_last_name",
    "tour",
    "notes",
    "address",
    "unit_number",
    "place_name",
    "host_name",
    "street_number",
    "street_name",
    "street_type",
    "clean_address",
];

const MATCH_COLUMNS: [&str; 4] = ["unmatched_address", "matched_address", "matched_id", "score"];

const REJECT_COLUMNS: [&str; 3] = ["ordinal", "text", "reason"];

/// Writes the table outputs of one run into `output_dir`.
pub(super) fn write_outputs(output_dir: &Path, output: &PipelineOutput) -> Result<OutputPaths> {
    ensure_directory(output_dir)?;

    let ledger_csv = output_dir.join("ledger.csv");
    write_csv(&ledger_csv, &LEDGER_COLUMNS, &output.records)?;

    let rejects_csv = output_dir.join("rejects.csv");
    write_csv(&rejects_csv, &REJECT_COLUMNS, &output.rejects)?;

    let mut paths = OutputPaths {
        output_dir: output_dir.display().to_string(),
        ledger_csv: ledger_csv.display().to_string(),
        rejects_csv: rejects_csv.display().to_string(),
        ..OutputPaths::default()
    };

    if let Some(report) = &output.linkage {
        let matched_csv = output_dir.join("matched.csv");
        write_csv(&matched_csv, &MATCH_COLUMNS, &report.matched)?;
        let unmatched_csv = output_dir.join("unmatched.csv");
        write_csv(&unmatched_csv, &MATCH_COLUMNS, &report.unmatched)?;

        paths.matched_csv = Some(matched_csv.display().to_string());
        paths.unmatched_csv = Some(unmatched_csv.display().to_string());
    }

    Ok(paths)
}

/// The header is written explicitly so empty tables still carry their columns.
fn write_csv<T: Serialize>(path: &Path, header: &[&str], records: &[T]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("failed to create csv file: {}", path.display()))?;

    writer
        .write_record(header)
        .with_context(|| format!("failed to write csv header: {}", path.display()))?;
    for record in records {
        writer
            .serialize(record)
            .with_context(|| format!("failed to write csv record: {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush csv file: {}", path.display()))?;

    info!(path = %path.display(), rows = records.len(), "wrote csv table");
    Ok(())
}
