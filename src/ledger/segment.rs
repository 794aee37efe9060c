use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use regex::Regex;

use super::types::{LedgerRow, RawRow, Tour};
use crate::util::collapse_whitespace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowClass {
    GroupHeader { label: String, note: String },
    TourMarker(Tour),
    Blank,
    Content,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveGroup {
    pub label: String,
    pub note: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanState {
    pub group: Option<ActiveGroup>,
    pub tour: Tour,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission {
    Row(LedgerRow),
    /// Content seen before any group header.
    Orphan(RawRow),
}

pub fn transition(state: ScanState, class: &RowClass, row: &RawRow) -> (ScanState, Option<Emission>) {
    match class {
        RowClass::GroupHeader { label, note } => (
            ScanState {
                group: Some(ActiveGroup {
                    label: label.clone(),
                    note: note.clone(),
                }),
                tour: Tour::A,
            },
            None,
        ),
        RowClass::TourMarker(tour) => (
            ScanState {
                tour: *tour,
                ..state
            },
            None,
        ),
        RowClass::Blank => (state, None),
        RowClass::Content => {
            let emission = match &state.group {
                Some(group) => Emission::Row(LedgerRow {
                    text: row.text.trim().to_string(),
                    group_label: group.label.clone(),
                    tour: state.tour,
                    notes: group.note.clone(),
                    ordinal: row.ordinal,
                    placeholder: false,
                }),
                None => Emission::Orphan(row.clone()),
            };
            (state, Some(emission))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segmentation {
    pub rows: Vec<LedgerRow>,
    pub orphans: Vec<RawRow>,
    pub control_rows: usize,
    pub blank_rows: usize,
    pub placeholder_rows: usize,
    /// Distinct group labels in order of first header appearance.
    pub group_labels: Vec<String>,
}

#[derive(Debug, Clone)]
struct HeaderSeen {
    label: String,
    note: String,
    ordinal: usize,
}

#[derive(Debug)]
pub struct LedgerSegmenter {
    group_header: Regex,
    tour_a: Regex,
    tour_b: Regex,
    bracket_note: Regex,
    year_prefix: Regex,
}

impl LedgerSegmenter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            group_header: Regex::new(r"(?i)^\s*\d{4}.*chair")
                .context("failed to compile group header regex")?,
            tour_a: Regex::new(r"(?i)\bTour A\b").context("failed to compile tour A regex")?,
            tour_b: Regex::new(r"(?i)\bTour B\b").context("failed to compile tour B regex")?,
            bracket_note: Regex::new(r"\[([^\]]*)\]")
                .context("failed to compile bracketed note regex")?,
            year_prefix: Regex::new(r"^\s*(\d{4})").context("failed to compile year prefix regex")?,
        })
    }

    pub fn classify(&self, text: &str) -> RowClass {
        if text.trim().is_empty() {
            return RowClass::Blank;
        }

        if self.group_header.is_match(text) {
            let (label, note) = self.split_header_note(text);
            return RowClass::GroupHeader { label, note };
        }

        // A row naming both tours switches to B.
        if self.tour_b.is_match(text) {
            return RowClass::TourMarker(Tour::B);
        }
        if self.tour_a.is_match(text) {
            return RowClass::TourMarker(Tour::A);
        }

        RowClass::Content
    }

    fn split_header_note(&self, text: &str) -> (String, String) {
        let notes: Vec<String> = self
            .bracket_note
            .captures_iter(text)
            .filter_map(|captures| captures.get(1))
            .map(|m| collapse_whitespace(m.as_str()))
            .filter(|note| !note.is_empty())
            .collect();

        let label = collapse_whitespace(&self.bracket_note.replace_all(text, " "));
        (label, notes.join("; "))
    }

    pub fn year_of(&self, group_label: &str) -> Option<u32> {
        self.year_prefix
            .captures(group_label)
            .and_then(|captures| captures.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
    }

    pub fn segment(&self, rows: &[RawRow]) -> Segmentation {
        let mut state = ScanState::default();
        let mut out = Segmentation::default();
        let mut headers = Vec::<HeaderSeen>::new();

        for row in rows {
            let class = self.classify(&row.text);
            match &class {
                RowClass::GroupHeader { label, note } => {
                    out.control_rows += 1;
                    headers.push(HeaderSeen {
                        label: label.clone(),
                        note: note.clone(),
                        ordinal: row.ordinal,
                    });
                }
                RowClass::TourMarker(_) => out.control_rows += 1,
                RowClass::Blank => out.blank_rows += 1,
                RowClass::Content => {}
            }

            let (next, emission) = transition(state, &class, row);
            state = next;

            match emission {
                Some(Emission::Row(ledger_row)) => out.rows.push(ledger_row),
                Some(Emission::Orphan(raw)) => out.orphans.push(raw),
                None => {}
            }
        }

        let placeholders = placeholder_rows(&headers, &out.rows);
        out.placeholder_rows = placeholders.len();
        out.rows.extend(placeholders);

        let mut seen_labels = HashSet::<&str>::new();
        for header in &headers {
            if seen_labels.insert(header.label.as_str()) {
                out.group_labels.push(header.label.clone());
            }
        }

        out.rows.sort_by_key(|row| {
            (
                self.year_of(&row.group_label).unwrap_or(u32::MAX),
                row.ordinal,
            )
        });

        out
    }
}

fn placeholder_rows(headers: &[HeaderSeen], rows: &[LedgerRow]) -> Vec<LedgerRow> {
    let mut content_counts = HashMap::<&str, usize>::new();
    for row in rows {
        *content_counts.entry(row.group_label.as_str()).or_insert(0) += 1;
    }

    // First header ordinal anchors the placeholder; the latest note wins.
    let mut order = Vec::<&str>::new();
    let mut anchors = HashMap::<&str, (usize, &str)>::new();
    for header in headers {
        anchors
            .entry(header.label.as_str())
            .and_modify(|(_, note)| *note = header.note.as_str())
            .or_insert_with(|| {
                order.push(header.label.as_str());
                (header.ordinal, header.note.as_str())
            });
    }

    order
        .into_iter()
        .filter(|label| content_counts.get(label).copied().unwrap_or(0) == 0)
        .filter_map(|label| {
            anchors.get(label).map(|(ordinal, note)| LedgerRow {
                text: String::new(),
                group_label: label.to_string(),
                tour: Tour::A,
                notes: note.to_string(),
                ordinal: *ordinal,
                placeholder: true,
            })
        })
        .collect()
}
