use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::ledger::DEFAULT_MATCH_THRESHOLD;

#[derive(Parser, Debug)]
#[command(
    name = "tour-ledger",
    version,
    about = "Normalize a historical tour ledger and link its addresses to a registry"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Process(ProcessArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ProcessArgs {
    /// CSV file holding the flattened ledger, one record per line.
    #[arg(long)]
    pub input: PathBuf,

    /// Header name of the text column. Without it the file is read headerless
    /// and every field of a record is joined into one text value.
    #[arg(long)]
    pub text_column: Option<String>,

    #[arg(long, default_value_t = 0)]
    pub skip_rows: usize,

    /// Master address registry CSV with `AddressLabel` and `AddressId` columns.
    #[arg(long)]
    pub registry: Option<PathBuf>,

    /// Minimum similarity score (0-100) for a registry match.
    #[arg(long, default_value_t = DEFAULT_MATCH_THRESHOLD)]
    pub match_threshold: f64,

    #[arg(long, default_value = "out")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = "out")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}
