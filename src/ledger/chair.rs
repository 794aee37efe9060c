use anyhow::{Context, Result};
use regex::Regex;
use tracing::trace;

use super::types::{ChairRecord, PersonName};
use crate::util::collapse_whitespace;

const NAME_SUFFIXES: [&str; 5] = ["Jr", "Sr", "II", "III", "IV"];

type NameRule = fn(&ChairNameResolver, &str) -> Option<Vec<String>>;

/// Rules in precedence order; the first one returning names wins.
const NAME_RULES: [(&str, NameRule); 3] = [
    ("couple_with_alias", ChairNameResolver::couple_with_alias),
    ("shared_last_name", ChairNameResolver::shared_last_name),
    ("separated_names", ChairNameResolver::separated_names),
];

#[derive(Debug)]
pub struct ChairNameResolver {
    parenthetical: Regex,
    bare_first_name: Regex,
    couple_alias: Regex,
    shared_last: Regex,
    separator: Regex,
    embedded_first: Regex,
    honorific: Regex,
    initials: Regex,
    suffix: Regex,
}

impl ChairNameResolver {
    pub fn new() -> Result<Self> {
        Ok(Self {
            parenthetical: Regex::new(r"\(([^)]*)\)")
                .context("failed to compile parenthetical regex")?,
            bare_first_name: Regex::new(r"^[A-Z][a-z'\-]+$")
                .context("failed to compile bare first name regex")?,
            couple_alias: Regex::new(
                r"(?i)^Mr\.?\s*(?:&|and)\s*Mrs\.?\s+([a-z][\w'\-]*)\s+\(([a-z][\w'\-]*)\)\s+(.+)$",
            )
            .context("failed to compile couple alias regex")?,
            shared_last: Regex::new(
                r"^([A-Z][\w'\-]*)\s*(?:&|\s[Aa]nd)\s*([A-Z][\w'\-]*)\s+([A-Z][\w'\-]*)$",
            )
            .context("failed to compile shared last name regex")?,
            separator: Regex::new(r"\s*&\s*|\s+(?i:and)\s+")
                .context("failed to compile name separator regex")?,
            embedded_first: Regex::new(r"\(([A-Za-z][\w'\-]*)\)\s+(\S.*)$")
                .context("failed to compile embedded first name regex")?,
            honorific: Regex::new(r"(?i)^(?:Mr|Mrs|Ms|Miss)\.?(?:\s+|$)")
                .context("failed to compile honorific regex")?,
            initials: Regex::new(r"^[A-Z]\.\s*[A-Z]\.").context("failed to compile initials regex")?,
            suffix: Regex::new(r"(?i)\b(?:Jr|Sr|II|III|IV)\b")
                .context("failed to compile name suffix regex")?,
        })
    }

    pub fn resolve(&self, chair_label: &str) -> ChairRecord {
        ChairRecord::from_people(&self.resolve_people(chair_label))
    }

    /// Resolves up to two people named by a chair label.
    pub fn resolve_people(&self, chair_label: &str) -> Vec<PersonName> {
        let cleaned = self.strip_asides(chair_label);
        if cleaned.is_empty() {
            return Vec::new();
        }

        NAME_RULES
            .iter()
            .find_map(|(name, rule)| {
                let names = rule(self, &cleaned)?;
                trace!(rule = *name, label = %cleaned, "chair label resolved");
                Some(names)
            })
            .unwrap_or_default()
            .iter()
            .take(2)
            .map(|full| split_person_name(full))
            .filter(|person| !person.full.is_empty())
            .collect()
    }

    fn strip_asides(&self, label: &str) -> String {
        let stripped = self.parenthetical.replace_all(label, |captures: &regex::Captures<'_>| {
            let inner = captures.get(1).map(|m| m.as_str().trim()).unwrap_or("");
            if self.bare_first_name.is_match(inner) {
                format!("({inner})")
            } else {
                " ".to_string()
            }
        });
        collapse_whitespace(&stripped)
    }

    fn strip_honorific(&self, text: &str) -> String {
        self.honorific.replace(text.trim(), "").trim().to_string()
    }

    fn couple_with_alias(&self, label: &str) -> Option<Vec<String>> {
        let captures = self.couple_alias.captures(label)?;
        let first = captures.get(1)?.as_str();
        let alias = captures.get(2)?.as_str();
        let last = captures.get(3)?.as_str().trim();

        Some(vec![format!("{alias} {last}"), format!("{first} {last}")])
    }

    fn shared_last_name(&self, label: &str) -> Option<Vec<String>> {
        let captures = self.shared_last.captures(label)?;
        let first_one = captures.get(1)?.as_str();
        let first_two = captures.get(2)?.as_str();
        let last = captures.get(3)?.as_str();

        Some(vec![format!("{first_one} {last}"), format!("{first_two} {last}")])
    }

    fn separated_names(&self, label: &str) -> Option<Vec<String>> {
        let whole_label = || Some(vec![self.strip_honorific(label)]);

        if self.suffix.is_match(label) {
            return whole_label();
        }

        let mut names = Vec::new();
        for segment in self.separator.splitn(label, 2) {
            let segment = segment.trim();

            if let Some(captures) = self.embedded_first.captures(segment) {
                let embedded = captures.get(1).map(|m| m.as_str()).unwrap_or("");
                let last = captures.get(2).map(|m| m.as_str().trim()).unwrap_or("");
                names.push(format!("{embedded} {last}"));
                continue;
            }

            let remainder = self.strip_honorific(segment);
            if self.initials.is_match(&remainder) {
                return whole_label();
            }
            if !remainder.is_empty() {
                names.push(remainder);
            }
        }

        Some(names)
    }
}

/// Splits a full name into first and last, keeping a trailing suffix with the first name.
pub fn split_person_name(full_name: &str) -> PersonName {
    let full = collapse_whitespace(full_name);
    let without_commas = full.replace(',', "");
    let tokens: Vec<&str> = without_commas.split_whitespace().collect();

    match tokens.as_slice() {
        [] => PersonName::default(),
        [.., last_name, suffix] if is_name_suffix(suffix) => {
            let mut first: Vec<&str> = tokens[..tokens.len() - 2].to_vec();
            first.push(*suffix);
            PersonName {
                full,
                first: first.join(" "),
                last: (*last_name).to_string(),
            }
        }
        [rest @ .., last_name] => PersonName {
            full,
            first: rest.join(" "),
            last: (*last_name).to_string(),
        },
    }
}

fn is_name_suffix(token: &str) -> bool {
    let bare = token.trim_end_matches('.');
    NAME_SUFFIXES
        .iter()
        .any(|suffix| suffix.eq_ignore_ascii_case(bare))
}

#[cfg(test)]
mod tests {
    use super::{ChairNameResolver, split_person_name};
    use crate::ledger::types::ChairRecord;

    fn resolver() -> ChairNameResolver {
        ChairNameResolver::new().expect("chair regexes should compile")
    }

    fn names(record: &ChairRecord) -> (&str, &str) {
        (record.chair1.as_str(), record.chair2.as_str())
    }

    #[test]
    fn resolves_two_people_joined_by_and() {
        let record = resolver().resolve("Jane Smith and John Doe");
        assert_eq!(record.chair1, "Jane Smith");
        assert_eq!(record.chair1_first, "Jane");
        assert_eq!(record.chair1_last, "Smith");
        assert_eq!(record.chair2, "John Doe");
        assert_eq!(record.chair2_first, "John");
        assert_eq!(record.chair2_last, "Doe");
    }

    #[test]
    fn couple_with_alias_lists_wife_first() {
        let record = resolver().resolve("Mr. & Mrs. John (Mary) Smith");
        assert_eq!(names(&record), ("Mary Smith", "John Smith"));
        assert_eq!(record.chair2_first, "John");
        assert_eq!(record.chair2_last, "Smith");
    }

    #[test]
    fn shared_last_name_applies_to_both_first_names() {
        let record = resolver().resolve("Ann & Bob Lee");
        assert_eq!(names(&record), ("Ann Lee", "Bob Lee"));
    }

    #[test]
    fn shared_last_name_accepts_spelled_out_and() {
        let record = resolver().resolve("Ann and Bob Lee");
        assert_eq!(names(&record), ("Ann Lee", "Bob Lee"));
        assert_eq!(record.chair2_first, "Bob");
        assert_eq!(record.chair2_last, "Lee");
    }

    #[test]
    fn lowercase_suffix_keeps_label_as_one_person() {
        let record = resolver().resolve("Bob Ray jr. & Ann Lee");
        assert_eq!(names(&record), ("Bob Ray jr. & Ann Lee", ""));
    }

    #[test]
    fn honorific_is_dropped_for_single_person() {
        let record = resolver().resolve("Mrs. Ann Lee");
        assert_eq!(names(&record), ("Ann Lee", ""));
        assert_eq!(record.chair1_first, "Ann");
        assert_eq!(record.chair2_first, "");
        assert_eq!(record.chair2_last, "");
    }

    #[test]
    fn suffix_keeps_label_as_one_person() {
        let record = resolver().resolve("Mr. John Smith, Jr.");
        assert_eq!(names(&record), ("John Smith, Jr.", ""));
        assert_eq!(record.chair1_first, "John Jr.");
        assert_eq!(record.chair1_last, "Smith");
    }

    #[test]
    fn initials_keep_label_as_one_person() {
        let record = resolver().resolve("J.R. Ewing");
        assert_eq!(names(&record), ("J.R. Ewing", ""));
        assert_eq!(record.chair1_first, "J.R.");
        assert_eq!(record.chair1_last, "Ewing");
    }

    #[test]
    fn asides_are_stripped_but_embedded_first_names_kept() {
        let record = resolver().resolve("Ann Lee (deceased) and Bob (Robert) Ray");
        assert_eq!(names(&record), ("Ann Lee", "Robert Ray"));
    }

    #[test]
    fn empty_label_resolves_to_empty_record() {
        let record = resolver().resolve("  ");
        assert!(record.is_empty());
        assert_eq!(record, ChairRecord::default());
    }

    #[test]
    fn split_person_name_handles_suffix_and_single_token() {
        let person = split_person_name("Robert Ray III");
        assert_eq!(person.first, "Robert III");
        assert_eq!(person.last, "Ray");

        let person = split_person_name("Cher");
        assert_eq!(person.first, "");
        assert_eq!(person.last, "Cher");

        let person = split_person_name("");
        assert_eq!(person.first, "");
        assert_eq!(person.last, "");
    }
}
