mod address;
mod chair;
mod entry;
mod group;
mod link;
mod pipeline;
mod segment;
mod types;

pub use link::DEFAULT_MATCH_THRESHOLD;
pub use pipeline::{PipelineOptions, PipelineOutput, run_pipeline};
pub use types::{MasterAddressEntry, MatchResult, PipelineStats, RawRow};
