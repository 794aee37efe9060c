use anyhow::{Context, Result};
use regex::Regex;

use super::types::GroupKey;

#[derive(Debug)]
pub struct GroupFieldSplitter {
    year: Regex,
    chair: Regex,
}

impl GroupFieldSplitter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            year: Regex::new(r"(\d{4})").context("failed to compile group year regex")?,
            chair: Regex::new(r"(?i)(?:co-)?chairs?,\s*(.*)")
                .context("failed to compile chair label regex")?,
        })
    }

    /// Returns `None` when the label carries no 4-digit year.
    pub fn split(&self, group_label: &str) -> Option<GroupKey> {
        let label = group_label.trim();
        let year = self
            .year
            .captures(label)
            .and_then(|captures| captures.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())?;

        let chair_label = self
            .chair
            .captures(label)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        Some(GroupKey { year, chair_label })
    }
}
