use std::ops::Range;

use anyhow::{Context, Result};
use regex::Regex;

use super::types::EntryFields;
use crate::util::collapse_whitespace;

#[derive(Debug)]
pub struct EntrySplitter {
    place: Regex,
    unit: Regex,
    dash: Regex,
}

impl EntrySplitter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            place: Regex::new(r"\[(.*?)\]").context("failed to compile place name regex")?,
            unit: Regex::new(r"[\s,]*#(\w+)").context("failed to compile unit number regex")?,
            dash: Regex::new(r"[-–—]{1,2}").context("failed to compile dash separator regex")?,
        })
    }

    pub fn split(&self, text: &str) -> EntryFields {
        let mut working = text.trim().to_string();

        let place = self.place.captures(&working).map(|captures| {
            let span = captures.get(0).map(|m| m.range()).unwrap_or(0..0);
            let name = captures
                .get(1)
                .map(|m| m.as_str().trim().to_string())
                .filter(|name| !name.is_empty());
            (span, name)
        });
        let place_name = match place {
            Some((span, name)) => {
                working = cut_span(&working, span);
                name
            }
            None => None,
        };

        let unit = self.unit.captures(&working).map(|captures| {
            let span = captures.get(0).map(|m| m.range()).unwrap_or(0..0);
            (span, captures.get(1).map(|m| m.as_str().to_string()))
        });
        let unit_number = match unit {
            Some((span, unit)) => {
                working = cut_span(&working, span);
                unit
            }
            None => None,
        };

        // Legacy rows separate address and host with a comma instead of a dash.
        if !self.dash.is_match(&working) && working.contains(',') {
            working = working.replacen(',', " –", 1);
        }

        let (address_text, host_text) = match self.dash.find(&working) {
            Some(found) => (
                working[..found.start()].trim().to_string(),
                non_empty(working[found.end()..].trim()),
            ),
            None => (working.trim().to_string(), None),
        };

        let host_text = host_text.or_else(|| place_name.clone());

        EntryFields {
            address_text,
            unit_number,
            place_name,
            host_text,
        }
    }
}

fn cut_span(text: &str, span: Range<usize>) -> String {
    let mut out = String::with_capacity(text.len());
    out.push_str(&text[..span.start]);
    out.push(' ');
    out.push_str(&text[span.end..]);
    collapse_whitespace(&out)
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::EntrySplitter;
    use crate::ledger::types::EntryFields;

    fn splitter() -> EntrySplitter {
        EntrySplitter::new().expect("entry regexes should compile")
    }

    #[test]
    fn place_name_is_extracted_before_dash_split() {
        let fields = splitter().split("123 Main St. [Smith House] - Jane Doe");
        assert_eq!(
            fields,
            EntryFields {
                address_text: "123 Main St.".to_string(),
                unit_number: None,
                place_name: Some("Smith House".to_string()),
                host_text: Some("Jane Doe".to_string()),
            }
        );
    }

    #[test]
    fn unit_number_is_removed_with_preceding_comma() {
        let fields = splitter().split("45 Oak Ave., #3 – Bob Ray");
        assert_eq!(fields.unit_number.as_deref(), Some("3"));
        assert_eq!(fields.address_text, "45 Oak Ave.");
        assert_eq!(fields.host_text.as_deref(), Some("Bob Ray"));
    }

    #[test]
    fn unit_number_without_separator_is_removed() {
        let fields = splitter().split("45 Oak Ave. #12B — Bob Ray");
        assert_eq!(fields.unit_number.as_deref(), Some("12B"));
        assert_eq!(fields.address_text, "45 Oak Ave.");
    }

    #[test]
    fn comma_rows_are_treated_as_dash_separated() {
        let fields = splitter().split("1 Elm St., Ann Lee");
        assert_eq!(fields.address_text, "1 Elm St.");
        assert_eq!(fields.host_text.as_deref(), Some("Ann Lee"));
    }

    #[test]
    fn place_name_stands_in_for_missing_host() {
        let fields = splitter().split("9 Pine St. [Old Church]");
        assert_eq!(fields.address_text, "9 Pine St.");
        assert_eq!(fields.place_name.as_deref(), Some("Old Church"));
        assert_eq!(fields.host_text.as_deref(), Some("Old Church"));
    }

    #[test]
    fn text_without_separator_is_all_address() {
        let fields = splitter().split("77 Grace St.");
        assert_eq!(fields.address_text, "77 Grace St.");
        assert!(fields.host_text.is_none());
        assert!(fields.place_name.is_none());
        assert!(fields.unit_number.is_none());
    }

    #[test]
    fn empty_text_yields_empty_fields() {
        assert_eq!(splitter().split(""), EntryFields::default());
    }

    #[test]
    fn only_first_dash_run_splits() {
        let fields = splitter().split("5 Park Ave. -- Ann Lee - guest of honor");
        assert_eq!(fields.address_text, "5 Park Ave.");
        assert_eq!(fields.host_text.as_deref(), Some("Ann Lee - guest of honor"));
    }
}
