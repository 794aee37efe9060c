use std::borrow::Cow;

use anyhow::{Context, Result};
use regex::Regex;

use super::types::CanonicalAddress;
use crate::util::collapse_whitespace;

#[derive(Debug, Clone, Copy)]
enum Follow {
    Any,
    /// Skip the match when the text after it matches.
    Unless(&'static str),
    /// Apply only when the text after it matches.
    Requires(&'static str),
}

use Follow::{Any, Requires, Unless};

/// Order matters: later rules assume earlier ones already ran.
const STREET_CORRECTIONS: &[(&str, &str, Follow)] = &[
    // Bare abbreviations gain a period.
    (r"\bAve\b", "Ave.", Unless(r"^\.")),
    (r"\bSt\b", "St.", Unless(r"^\.")),
    (r"\bBlvd\b", "Blvd.", Unless(r"^\.")),
    (r"\bDr\b", "Dr.", Unless(r"^\.")),
    (r"\bCt\b", "Ct.", Unless(r"^\.")),
    (r"\bRd\b", "Rd.", Unless(r"^\.")),
    (r"\bLn\b", "Ln.", Unless(r"^\.")),
    (r"\bWay\b", "Way.", Unless(r"^\.")),
    (r"\bCir\b", "Cir.", Unless(r"^\.")),
    (r"\bTerr\b", "Terr.", Unless(r"^\.")),
    (r"\bPl\b", "Pl.", Unless(r"^\.")),
    // Long forms collapse to abbreviations.
    (r"\bCircle\b", "Cir.", Unless(r"^\.")),
    (r"\bAvenue\b", "Ave.", Unless(r"^\.")),
    (r"\bStreet\b", "St.", Unless(r"^\.")),
    (r"\bBoulevard\b", "Blvd.", Unless(r"^\.")),
    (r"\bDrive\b", "Dr.", Unless(r"^\.")),
    (r"\bCourt\b", "Ct.", Unless(r"^\.")),
    (r"\bRoad\b", "Rd.", Unless(r"^\.")),
    (r"\bLane\b", "Ln.", Unless(r"^\.")),
    (r"\bPlace\b", "Pl.", Unless(r"^\.")),
    (r"\bTerrace\b", "Terr.", Unless(r"^\.")),
    // Historically inconsistent street names.
    (r"\bN\. Davis\b", "N. Davis Ave.", Unless(r"^\sAve")),
    (r"\bN\. Allen\b", "N. Allen Ave.", Unless(r"^\sAve")),
    (r"\bWest Grace\b", "W. Grace St.", Unless(r"^\sSt")),
    (r"\bN\.? Harrison\b", "N. Harrison St.", Unless(r"^\sSt")),
    (r"\bNorth Rowland\b", "N. Rowland St.", Unless(r"^\sSt")),
    (r"\bWest Franklin\b", "W. Franklin St.", Unless(r"^\sSt")),
    // Directionals.
    (r"\bNorth\b", "N.", Any),
    (r"\bSouth\b", "S.", Any),
    (r"\bEast\b", "E.", Any),
    (r"\b([NSEW])\s+", "${1}. ", Requires(r"^[A-Z]")),
    // Half numbers and numbered units fold into the street number.
    (r"\b(\d+)\s+1/2\b", "${1}-2", Any),
    (r"\b(\d+)\s+#(\d+)\b", "${1}-${2}", Any),
];

const STREET_NAME_RECODES: &[(&str, &str)] = &[
    ("West Franklin", "W. Franklin"),
    ("Harvie", "N. Harvie"),
    ("Franklin", "W. Franklin"),
    ("Strawberry", "N. Strawberry"),
    ("Broad", "W. Broad"),
    ("Main", "W. Main"),
    ("Addison", "S. Addison"),
    ("West Grace", "W. Grace"),
    ("Plum", "N. Plum"),
    ("Shields", "N. Shields"),
    ("Stafford", "N. Stafford"),
    ("Meadow", "N. Meadow"),
    ("Rowland", "N. Rowland"),
    ("Morris", "N. Morris"),
    ("Linden", "N. Linden"),
    ("Harrison", "N. Harrison"),
    ("Lombardy", "N. Lombardy"),
];

#[derive(Debug)]
struct CorrectionRule {
    pattern: Regex,
    replacement: &'static str,
    following: Option<(Regex, bool)>,
}

impl CorrectionRule {
    fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        let Some((guard, required)) = &self.following else {
            return self.pattern.replace_all(text, self.replacement);
        };

        let mut out = String::with_capacity(text.len() + 8);
        let mut last = 0;
        let mut changed = false;

        for captures in self.pattern.captures_iter(text) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            if guard.is_match(&text[whole.end()..]) != *required {
                continue;
            }

            out.push_str(&text[last..whole.start()]);
            captures.expand(self.replacement, &mut out);
            last = whole.end();
            changed = true;
        }

        if !changed {
            return Cow::Borrowed(text);
        }

        out.push_str(&text[last..]);
        Cow::Owned(out)
    }
}

#[derive(Debug)]
pub struct AddressCanonicalizer {
    corrections: Vec<CorrectionRule>,
    structure: Regex,
}

impl AddressCanonicalizer {
    pub fn new() -> Result<Self> {
        let corrections = STREET_CORRECTIONS
            .iter()
            .map(|&(pattern, replacement, follow)| -> Result<CorrectionRule> {
                let guard = |guard: &str| {
                    Regex::new(guard)
                        .with_context(|| format!("failed to compile guard regex {guard}"))
                };
                Ok(CorrectionRule {
                    pattern: Regex::new(pattern)
                        .with_context(|| format!("failed to compile correction regex {pattern}"))?,
                    replacement,
                    following: match follow {
                        Any => None,
                        Unless(after) => Some((guard(after)?, false)),
                        Requires(after) => Some((guard(after)?, true)),
                    },
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let street_type =
            r"(Ave\.?|St\.?|Blvd\.?|Dr\.?|Ct\.?|Rd\.?|Ln\.?|Way\.?|Cir\.?|Terr\.?|Pl\.?|Alley\.?|Al\.?)";
        let structure = Regex::new(&format!(r"^\s*(\d+(?:-\w+)?)\s+(.*?)\s+{street_type}\s*$"))
            .context("failed to compile street structure regex")?;

        Ok(Self {
            corrections,
            structure,
        })
    }

    /// Runs the ordered correction table over raw address text.
    pub fn correct(&self, address_text: &str) -> String {
        let mut text = collapse_whitespace(address_text);
        for rule in &self.corrections {
            let updated = match rule.apply(&text) {
                Cow::Owned(updated) => Some(updated),
                Cow::Borrowed(_) => None,
            };
            if let Some(updated) = updated {
                text = updated;
            }
        }
        text
    }

    pub fn canonicalize(&self, address_text: &str) -> CanonicalAddress {
        let corrected = self.correct(address_text);

        let Some(captures) = self.structure.captures(&corrected) else {
            return CanonicalAddress::default();
        };

        let part = |index: usize| {
            captures
                .get(index)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default()
        };
        let street_number = part(1);
        let street_name = recode_street_name(&part(2)).to_string();
        let street_type = part(3);

        let clean_address =
            if street_number.is_empty() || street_name.is_empty() || street_type.is_empty() {
                String::new()
            } else {
                format!("{street_number} {street_name} {street_type}")
            };

        CanonicalAddress {
            street_number,
            street_name,
            street_type,
            clean_address,
        }
    }
}

fn recode_street_name(name: &str) -> &str {
    STREET_NAME_RECODES
        .iter()
        .find(|(from, _)| *from == name)
        .map(|(_, to)| *to)
        .unwrap_or(name)
}
