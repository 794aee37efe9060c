use std::fmt;

use serde::{Deserialize, Serialize};

/// One input line and its position in the source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawRow {
    pub text: String,
    pub ordinal: usize,
}

impl RawRow {
    pub fn new(ordinal: usize, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ordinal,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tour {
    #[default]
    A,
    B,
}

impl Tour {
    pub fn as_str(self) -> &'static str {
        match self {
            Tour::A => "A",
            Tour::B => "B",
        }
    }
}

impl fmt::Display for Tour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerRow {
    pub text: String,
    pub group_label: String,
    pub tour: Tour,
    pub notes: String,
    pub ordinal: usize,
    /// Synthesized for a group that had no content rows.
    pub placeholder: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupKey {
    pub year: u32,
    pub chair_label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersonName {
    pub full: String,
    pub first: String,
    pub last: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChairRecord {
    pub chair1: String,
    pub chair1_first: String,
    pub chair1_last: String,
    pub chair2: String,
    pub chair2_first: String,
    pub chair2_last: String,
}

impl ChairRecord {
    pub fn from_people(people: &[PersonName]) -> Self {
        let first = people.first().cloned().unwrap_or_default();
        let second = people.get(1).cloned().unwrap_or_default();
        Self {
            chair1: first.full,
            chair1_first: first.first,
            chair1_last: first.last,
            chair2: second.full,
            chair2_first: second.first,
            chair2_last: second.last,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chair1.is_empty() && self.chair2.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntryFields {
    pub address_text: String,
    pub unit_number: Option<String>,
    pub place_name: Option<String>,
    pub host_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CanonicalAddress {
    pub street_number: String,
    pub street_name: String,
    pub street_type: String,
    pub clean_address: String,
}

impl CanonicalAddress {
    pub fn is_parsed(&self) -> bool {
        !self.clean_address.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterAddressEntry {
    #[serde(rename = "AddressLabel")]
    pub address_label: String,
    #[serde(rename = "AddressId")]
    pub address_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub unmatched_address: String,
    pub matched_address: String,
    pub matched_id: String,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkageReport {
    pub threshold: f64,
    pub matched: Vec<MatchResult>,
    pub unmatched: Vec<MatchResult>,
}

/// One row of the flattened output table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerRecord {
    pub year: u32,
    pub chair1: String,
    pub chair1_first_name: String,
    pub chair1_last_name: String,
    pub chair2: String,
    pub chair2_first_name: String,
    pub chair2_last_name: String,
    pub tour: String,
    pub notes: String,
    pub address: String,
    pub unit_number: Option<String>,
    pub place_name: Option<String>,
    pub host_name: Option<String>,
    pub street_number: String,
    pub street_name: String,
    pub street_type: String,
    pub clean_address: String,
    #[serde(skip)]
    pub ordinal: usize,
    #[serde(skip)]
    pub placeholder: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    NoGroupContext,
    MalformedGroupLabel,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::NoGroupContext => "no_group_context",
            RejectReason::MalformedGroupLabel => "malformed_group_label",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    pub ordinal: usize,
    pub text: String,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub input_rows: usize,
    pub control_rows: usize,
    pub blank_rows: usize,
    pub content_rows: usize,
    pub placeholder_rows: usize,
    pub rejected_rows: usize,
    pub groups: usize,
    pub unparsed_addresses: usize,
    pub matched_addresses: usize,
    pub unmatched_addresses: usize,
}
