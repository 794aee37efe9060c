use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

use crate::ledger::{MatchResult, PipelineOutput};
use crate::util::now_utc_string;

pub(super) const DB_SCHEMA_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) struct ExportCounts {
    pub ledger_rows: usize,
    pub address_matches: usize,
    pub rejects: usize,
}

pub(super) fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

pub(super) fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS ledger (
              run_id TEXT NOT NULL,
              ordinal INTEGER NOT NULL,
              placeholder INTEGER NOT NULL,
              year INTEGER NOT NULL,
              chair1 TEXT NOT NULL,
              chair1_first_name TEXT NOT NULL,
              chair1_last_name TEXT NOT NULL,
              chair2 TEXT NOT NULL,
              chair2_first_name TEXT NOT NULL,
              chair2_last_name TEXT NOT NULL,
              tour TEXT NOT NULL,
              notes TEXT NOT NULL,
              address TEXT NOT NULL,
              unit_number TEXT,
              place_name TEXT,
              host_name TEXT,
              street_number TEXT NOT NULL,
              street_name TEXT NOT NULL,
              street_type TEXT NOT NULL,
              clean_address TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS address_matches (
              run_id TEXT NOT NULL,
              clean_address TEXT NOT NULL,
              matched_address TEXT NOT NULL,
              matched_id TEXT NOT NULL,
              score REAL NOT NULL,
              status TEXT NOT NULL CHECK(status IN ('matched', 'unmatched'))
            );

            CREATE TABLE IF NOT EXISTS rejects (
              run_id TEXT NOT NULL,
              ordinal INTEGER NOT NULL,
              text TEXT NOT NULL,
              reason TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_ledger_year ON ledger(year, ordinal);
            CREATE INDEX IF NOT EXISTS idx_ledger_clean_address ON ledger(clean_address);
            CREATE INDEX IF NOT EXISTS idx_address_matches_status ON address_matches(status);
            ",
        )
        .context("failed to create export schema")?;

    upsert_metadata(connection, "db_schema_version", DB_SCHEMA_VERSION)?;
    Ok(())
}

fn upsert_metadata(connection: &Connection, key: &str, value: &str) -> Result<()> {
    connection
        .execute(
            "INSERT INTO metadata(key, value) VALUES(?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value",
            [key, value],
        )
        .with_context(|| format!("failed to update metadata key {key}"))?;
    Ok(())
}

/// Replaces the previous export with this run's tables in one transaction.
pub(super) fn export_run(
    connection: &mut Connection,
    run_id: &str,
    output: &PipelineOutput,
) -> Result<ExportCounts> {
    let tx = connection.transaction()?;

    tx.execute_batch("DELETE FROM ledger; DELETE FROM address_matches; DELETE FROM rejects;")
        .context("failed to clear previous export")?;

    let mut counts = ExportCounts::default();

    {
        let mut statement = tx.prepare(
            "
            INSERT INTO ledger(
              run_id, ordinal, placeholder, year,
              chair1, chair1_first_name, chair1_last_name,
              chair2, chair2_first_name, chair2_last_name,
              tour, notes, address, unit_number, place_name, host_name,
              street_number, street_name, street_type, clean_address
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
            ",
        )?;

        for record in &output.records {
            statement.execute(params![
                run_id,
                record.ordinal as i64,
                record.placeholder,
                record.year,
                &record.chair1,
                &record.chair1_first_name,
                &record.chair1_last_name,
                &record.chair2,
                &record.chair2_first_name,
                &record.chair2_last_name,
                &record.tour,
                &record.notes,
                &record.address,
                &record.unit_number,
                &record.place_name,
                &record.host_name,
                &record.street_number,
                &record.street_name,
                &record.street_type,
                &record.clean_address,
            ])?;
            counts.ledger_rows += 1;
        }
    }

    if let Some(report) = &output.linkage {
        let mut statement = tx.prepare(
            "
            INSERT INTO address_matches(run_id, clean_address, matched_address, matched_id, score, status)
            VALUES(?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )?;

        let tagged = report
            .matched
            .iter()
            .map(|result| (result, "matched"))
            .chain(report.unmatched.iter().map(|result| (result, "unmatched")));

        for (result, status) in tagged {
            insert_match(&mut statement, run_id, result, status)?;
            counts.address_matches += 1;
        }
    }

    {
        let mut statement =
            tx.prepare("INSERT INTO rejects(run_id, ordinal, text, reason) VALUES(?1, ?2, ?3, ?4)")?;
        for reject in &output.rejects {
            statement.execute(params![
                run_id,
                reject.ordinal as i64,
                &reject.text,
                reject.reason.as_str()
            ])?;
            counts.rejects += 1;
        }
    }

    upsert_metadata(&tx, "db_updated_at", &now_utc_string())?;
    upsert_metadata(&tx, "last_run_id", run_id)?;

    tx.commit().context("failed to commit export transaction")?;

    info!(
        ledger_rows = counts.ledger_rows,
        address_matches = counts.address_matches,
        rejects = counts.rejects,
        "exported run to sqlite"
    );

    Ok(counts)
}

fn insert_match(
    statement: &mut rusqlite::Statement<'_>,
    run_id: &str,
    result: &MatchResult,
    status: &str,
) -> Result<()> {
    statement.execute(params![
        run_id,
        &result.unmatched_address,
        &result.matched_address,
        &result.matched_id,
        result.score,
        status
    ])?;
    Ok(())
}

pub fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}

pub fn metadata_value(connection: &Connection, key: &str) -> Result<Option<String>> {
    connection
        .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()
        .with_context(|| format!("failed to read metadata key {key}"))
}
