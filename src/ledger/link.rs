use std::collections::HashSet;

use tracing::debug;

use super::types::{LinkageReport, MasterAddressEntry, MatchResult};
use crate::util::collapse_whitespace;

pub const DEFAULT_MATCH_THRESHOLD: f64 = 90.0;

pub trait AddressMatcher {
    /// Index of the best pool entry and its 0-100 score, or `None` for an empty pool.
    fn best_match(&self, candidate: &str, pool: &[String]) -> Option<(usize, f64)>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokenSortMatcher;

impl AddressMatcher for TokenSortMatcher {
    fn best_match(&self, candidate: &str, pool: &[String]) -> Option<(usize, f64)> {
        let sorted_candidate = sort_tokens(candidate);
        let mut best: Option<(usize, f64)> = None;

        for (index, label) in pool.iter().enumerate() {
            let score = sorted_ratio(&sorted_candidate, &sort_tokens(label));
            // Strictly greater keeps the first entry on ties.
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((index, score));
            }
        }

        best
    }
}

fn sorted_ratio(left: &str, right: &str) -> f64 {
    if left.is_empty() && right.is_empty() {
        return 100.0;
    }
    strsim::normalized_levenshtein(left, right) * 100.0
}

fn sort_tokens(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Lowercases, drops periods and commas, removes "rear", and collapses spaces.
pub fn normalize_address(text: &str) -> String {
    let lowered: String = text
        .to_lowercase()
        .chars()
        .filter(|ch| *ch != '.' && *ch != ',')
        .collect();
    collapse_whitespace(&lowered.replace("rear", ""))
}

#[derive(Debug)]
pub struct AddressLinker<M = TokenSortMatcher> {
    matcher: M,
    threshold: f64,
}

impl AddressLinker<TokenSortMatcher> {
    pub fn with_threshold(threshold: f64) -> Self {
        Self::new(TokenSortMatcher, threshold)
    }
}

impl<M: AddressMatcher> AddressLinker<M> {
    pub fn new(matcher: M, threshold: f64) -> Self {
        Self { matcher, threshold }
    }

    pub fn link(&self, addresses: &[String], registry: &[MasterAddressEntry]) -> LinkageReport {
        let pool: Vec<String> = registry
            .iter()
            .map(|entry| normalize_address(&entry.address_label))
            .collect();

        let mut report = LinkageReport {
            threshold: self.threshold,
            ..LinkageReport::default()
        };
        let mut seen = HashSet::<&str>::new();

        for address in addresses {
            if address.trim().is_empty() || !seen.insert(address.as_str()) {
                continue;
            }

            let normalized = normalize_address(address);
            let best = if normalized.is_empty() {
                None
            } else {
                self.matcher.best_match(&normalized, &pool)
            };

            let result = match best.and_then(|(index, score)| Some((registry.get(index)?, score))) {
                Some((entry, score)) => MatchResult {
                    unmatched_address: address.clone(),
                    matched_address: entry.address_label.clone(),
                    matched_id: entry.address_id.clone(),
                    score: round_score(score),
                },
                None => MatchResult {
                    unmatched_address: address.clone(),
                    matched_address: String::new(),
                    matched_id: String::new(),
                    score: 0.0,
                },
            };

            debug!(
                address = %result.unmatched_address,
                candidate = %result.matched_address,
                score = result.score,
                "scored address"
            );

            if result.score >= self.threshold {
                report.matched.push(result);
            } else {
                report.unmatched.push(result);
            }
        }

        report
    }
}

fn round_score(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}
