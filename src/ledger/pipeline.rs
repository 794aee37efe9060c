use std::collections::HashMap;

use anyhow::Result;
use tracing::{debug, info, warn};

use super::address::AddressCanonicalizer;
use super::chair::ChairNameResolver;
use super::entry::EntrySplitter;
use super::group::GroupFieldSplitter;
use super::link::{AddressLinker, DEFAULT_MATCH_THRESHOLD};
use super::segment::LedgerSegmenter;
use super::types::{
    CanonicalAddress, ChairRecord, EntryFields, GroupKey, LedgerRecord, LedgerRow, LinkageReport,
    MasterAddressEntry, PipelineStats, RawRow, RejectReason, RejectedRow,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOptions {
    pub match_threshold: f64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub records: Vec<LedgerRecord>,
    pub rejects: Vec<RejectedRow>,
    /// `None` when no registry was supplied.
    pub linkage: Option<LinkageReport>,
    pub stats: PipelineStats,
}

#[derive(Debug)]
pub struct LedgerPipeline {
    segmenter: LedgerSegmenter,
    groups: GroupFieldSplitter,
    chairs: ChairNameResolver,
    entries: EntrySplitter,
    addresses: AddressCanonicalizer,
}

impl LedgerPipeline {
    pub fn new() -> Result<Self> {
        Ok(Self {
            segmenter: LedgerSegmenter::new()?,
            groups: GroupFieldSplitter::new()?,
            chairs: ChairNameResolver::new()?,
            entries: EntrySplitter::new()?,
            addresses: AddressCanonicalizer::new()?,
        })
    }

    pub fn run(
        &self,
        rows: &[RawRow],
        registry: Option<&[MasterAddressEntry]>,
        options: &PipelineOptions,
    ) -> PipelineOutput {
        let segmentation = self.segmenter.segment(rows);

        let mut stats = PipelineStats {
            input_rows: rows.len(),
            control_rows: segmentation.control_rows,
            blank_rows: segmentation.blank_rows,
            placeholder_rows: segmentation.placeholder_rows,
            groups: segmentation.group_labels.len(),
            ..PipelineStats::default()
        };

        let mut rejects: Vec<RejectedRow> = segmentation
            .orphans
            .iter()
            .map(|row| RejectedRow {
                ordinal: row.ordinal,
                text: row.text.trim().to_string(),
                reason: RejectReason::NoGroupContext,
            })
            .collect();

        let group_fields = self.resolve_groups(&segmentation.rows);
        let entry_fields: Vec<(EntryFields, CanonicalAddress)> = segmentation
            .rows
            .iter()
            .map(|row| self.split_entry(row))
            .collect();

        let mut records = Vec::with_capacity(segmentation.rows.len());
        for (row, (entry, address)) in segmentation.rows.iter().zip(entry_fields) {
            let Some((key, chair)) = group_fields.get(row.group_label.as_str()) else {
                rejects.push(RejectedRow {
                    ordinal: row.ordinal,
                    text: if row.placeholder {
                        row.group_label.clone()
                    } else {
                        row.text.clone()
                    },
                    reason: RejectReason::MalformedGroupLabel,
                });
                continue;
            };

            if !row.placeholder {
                stats.content_rows += 1;
                if !address.is_parsed() {
                    stats.unparsed_addresses += 1;
                }
            }

            records.push(build_record(row, key, chair, entry, address));
        }

        rejects.sort_by_key(|reject| reject.ordinal);
        for reject in &rejects {
            warn!(
                ordinal = reject.ordinal,
                reason = reject.reason.as_str(),
                text = %reject.text,
                "rejected ledger row"
            );
        }
        stats.rejected_rows = rejects.len();

        let linkage = registry.map(|registry| {
            let candidates: Vec<String> = records
                .iter()
                .filter(|record| !record.placeholder)
                .map(|record| record.clean_address.clone())
                .collect();
            AddressLinker::with_threshold(options.match_threshold).link(&candidates, registry)
        });

        if let Some(report) = &linkage {
            stats.matched_addresses = report.matched.len();
            stats.unmatched_addresses = report.unmatched.len();
        }

        info!(
            input_rows = stats.input_rows,
            content_rows = stats.content_rows,
            groups = stats.groups,
            placeholders = stats.placeholder_rows,
            rejected = stats.rejected_rows,
            unparsed_addresses = stats.unparsed_addresses,
            linked = linkage.is_some(),
            "ledger pipeline completed"
        );

        PipelineOutput {
            records,
            rejects,
            linkage,
            stats,
        }
    }

    fn resolve_groups(&self, rows: &[LedgerRow]) -> HashMap<String, (GroupKey, ChairRecord)> {
        let mut resolved = HashMap::new();
        for row in rows {
            if resolved.contains_key(&row.group_label) {
                continue;
            }
            if let Some(key) = self.groups.split(&row.group_label) {
                let chair = self.chairs.resolve(&key.chair_label);
                if chair.is_empty() {
                    debug!(label = %row.group_label, "chair label did not resolve to a name");
                }
                resolved.insert(row.group_label.clone(), (key, chair));
            }
        }
        resolved
    }

    fn split_entry(&self, row: &LedgerRow) -> (EntryFields, CanonicalAddress) {
        let entry = self.entries.split(&row.text);
        let address = self.addresses.canonicalize(&entry.address_text);
        (entry, address)
    }
}

pub fn run_pipeline(
    rows: &[RawRow],
    registry: Option<&[MasterAddressEntry]>,
    options: &PipelineOptions,
) -> Result<PipelineOutput> {
    let pipeline = LedgerPipeline::new()?;
    Ok(pipeline.run(rows, registry, options))
}

fn build_record(
    row: &LedgerRow,
    key: &GroupKey,
    chair: &ChairRecord,
    entry: EntryFields,
    address: CanonicalAddress,
) -> LedgerRecord {
    LedgerRecord {
        year: key.year,
        chair1: chair.chair1.clone(),
        chair1_first_name: chair.chair1_first.clone(),
        chair1_last_name: chair.chair1_last.clone(),
        chair2: chair.chair2.clone(),
        chair2_first_name: chair.chair2_first.clone(),
        chair2_last_name: chair.chair2_last.clone(),
        tour: row.tour.as_str().to_string(),
        notes: row.notes.clone(),
        address: entry.address_text,
        unit_number: entry.unit_number,
        place_name: entry.place_name,
        host_name: entry.host_text,
        street_number: address.street_number,
        street_name: address.street_name,
        street_type: address.street_type,
        clean_address: address.clean_address,
        ordinal: row.ordinal,
        placeholder: row.placeholder,
    }
}
