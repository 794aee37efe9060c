use serde::{Deserialize, Serialize};

use crate::ledger::PipelineStats;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceHash {
    pub path: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceHashes {
    pub input: SourceHash,
    pub registry: Option<SourceHash>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputPaths {
    pub output_dir: String,
    pub ledger_csv: String,
    pub rejects_csv: String,
    pub matched_csv: Option<String>,
    pub unmatched_csv: Option<String>,
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSettings {
    pub text_column: Option<String>,
    pub skip_rows: usize,
    pub match_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub tool_version: String,
    pub db_schema_version: Option<String>,
    pub status: String,
    pub started_at: String,
    pub completed_at: String,
    pub command: String,
    pub settings: ProcessSettings,
    pub source_hashes: SourceHashes,
    pub paths: OutputPaths,
    pub counts: PipelineStats,
    pub warnings: Vec<String>,
}
