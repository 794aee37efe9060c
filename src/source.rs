use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::ledger::{MasterAddressEntry, RawRow};

#[derive(Debug, Clone, Default)]
pub struct RowSourceOptions {
    /// Header name of the text column. `None` reads the file headerless.
    pub text_column: Option<String>,
    pub skip_rows: usize,
}

pub fn load_rows(path: &Path, options: &RowSourceOptions) -> Result<Vec<RawRow>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open ledger input: {}", path.display()))?;
    let rows = read_rows(file, options)
        .with_context(|| format!("failed to read ledger input: {}", path.display()))?;

    info!(path = %path.display(), rows = rows.len(), "loaded ledger rows");
    Ok(rows)
}

/// Reads ledger rows from CSV. Ordinals follow the record index in the source,
/// so skipped leading records still count. Blank rows are kept for the
/// segmenter to skip.
pub fn read_rows<R: Read>(reader: R, options: &RowSourceOptions) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(options.text_column.is_some())
        .flexible(true)
        .from_reader(reader);

    let column_index = match &options.text_column {
        Some(name) => {
            let headers = reader.headers().context("failed to read csv header")?;
            let Some(index) = headers.iter().position(|header| header.trim() == name.as_str()) else {
                bail!("text column {name:?} not found in csv header");
            };
            Some(index)
        }
        None => None,
    };

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("failed to parse csv record {index}"))?;
        if index < options.skip_rows {
            debug!(record = index, "skipping leading record");
            continue;
        }

        let text = match column_index {
            Some(column) => record.get(column).unwrap_or_default().trim().to_string(),
            None => record
                .iter()
                .map(str::trim)
                .filter(|field| !field.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        };
        rows.push(RawRow::new(index, text));
    }

    if rows.is_empty() {
        bail!("ledger input contains no records");
    }

    Ok(rows)
}

pub fn load_registry(path: &Path) -> Result<Vec<MasterAddressEntry>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open address registry: {}", path.display()))?;
    let entries = read_registry(file)
        .with_context(|| format!("failed to read address registry: {}", path.display()))?;

    info!(path = %path.display(), entries = entries.len(), "loaded address registry");
    Ok(entries)
}

pub fn read_registry<R: Read>(reader: R) -> Result<Vec<MasterAddressEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    reader
        .deserialize::<MasterAddressEntry>()
        .enumerate()
        .map(|(index, result)| {
            result.with_context(|| format!("failed to parse registry record {index}"))
        })
        .collect()
}
