//! Per-patient scrubber compilation
//!
//! The builder turns one [`PatientIdentifierSet`] into a compiled
//! [`Scrubber`]. Each identifier value expands into one or more match
//! patterns according to its kind and the loaded [`ScrubRules`]: dates
//! into every configured rendering, numeric identifiers into
//! separator-tolerant digit sequences, names and addresses into
//! case-insensitive whole-word literals.

use crate::scrub::identifiers::{IdentifierKind, PatientIdentifierSet};
use crate::scrub::rules::ScrubRules;
use crate::scrub::scrubber::{ScrubPattern, Scrubber};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::BTreeSet;

/// Compiles per-patient scrubbers from the active rule policy
///
/// One builder is created at startup and shared read-only by all
/// workers; each call to [`build`](Self::build) produces a scrubber
/// owned by exactly one patient's worker.
#[derive(Debug, Clone)]
pub struct ScrubberBuilder {
    rules: ScrubRules,
}

impl ScrubberBuilder {
    /// Create a builder with an explicit rule policy
    pub fn new(rules: ScrubRules) -> Self {
        Self { rules }
    }

    /// Create a builder with the embedded default policy
    pub fn with_default_rules() -> Result<Self> {
        Ok(Self::new(ScrubRules::default_rules()?))
    }

    /// Compile a scrubber for one patient's identifier set.
    ///
    /// Values below the configured minimum length are excluded to avoid
    /// over-redaction of common substrings. An empty set compiles to an
    /// identity scrubber.
    pub fn build(&self, set: &PatientIdentifierSet) -> Result<Scrubber> {
        let mut patterns = Vec::new();

        for (kind, value) in set.iter() {
            for source in self.pattern_sources(kind, value) {
                let regex = Regex::new(&source)
                    .with_context(|| format!("Failed to compile scrub pattern for {kind}"))?;
                patterns.push(ScrubPattern { regex, kind });
            }
        }

        Ok(Scrubber::new(patterns))
    }

    /// Expand one identifier value into regex sources for its kind
    fn pattern_sources(&self, kind: IdentifierKind, value: &str) -> Vec<String> {
        match kind {
            IdentifierKind::Name | IdentifierKind::Address | IdentifierKind::Email => {
                self.word_pattern(value).into_iter().collect()
            }
            IdentifierKind::Postcode => self.postcode_pattern(value).into_iter().collect(),
            IdentifierKind::Date => self.date_patterns(value),
            IdentifierKind::NationalId | IdentifierKind::Phone => {
                self.digit_pattern(value).into_iter().collect()
            }
        }
    }

    /// Case-insensitive whole-word literal, with internal whitespace
    /// normalized so multi-word values match across line wraps.
    fn word_pattern(&self, value: &str) -> Option<String> {
        let value = value.trim();
        if value.chars().count() < self.rules.general.min_token_length {
            return None;
        }
        let tokens: Vec<String> = value.split_whitespace().map(regex::escape).collect();
        if tokens.is_empty() {
            return None;
        }
        Some(format!(r"(?i)\b{}\b", tokens.join(r"\s+")))
    }

    /// Postcodes match with or without internal whitespace
    fn postcode_pattern(&self, value: &str) -> Option<String> {
        let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.chars().count() < self.rules.general.min_token_length {
            return None;
        }
        let parts: Vec<String> = compact
            .chars()
            .map(|c| regex::escape(&c.to_string()))
            .collect();
        Some(format!(r"(?i)\b{}\b", parts.join(r"\s*")))
    }

    /// Dates expand into every configured rendering of the parsed value;
    /// unparseable values fall back to literal matching.
    fn date_patterns(&self, value: &str) -> Vec<String> {
        let trimmed = value.trim();

        let parsed = self
            .rules
            .dates
            .input_formats
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok());

        let Some(date) = parsed else {
            return self.word_pattern(trimmed).into_iter().collect();
        };

        // Dedup: several formats can render identically (e.g. a
        // palindromic day/month pair).
        let mut renderings: BTreeSet<String> = BTreeSet::new();
        renderings.insert(trimmed.to_string());
        for fmt in &self.rules.dates.output_formats {
            renderings.insert(date.format(fmt).to_string());
        }

        renderings
            .into_iter()
            .map(|r| format!(r"(?i)\b{}\b", regex::escape(&r)))
            .collect()
    }

    /// Numeric identifiers match their digit sequence with optional
    /// separators between any two digits.
    fn digit_pattern(&self, value: &str) -> Option<String> {
        let digits: Vec<char> = value.chars().filter(char::is_ascii_digit).collect();
        if digits.len() < self.rules.general.min_digit_count {
            return None;
        }
        let sep = self.rules.separator_class();
        let body: Vec<String> = digits.iter().map(|d| d.to_string()).collect();
        Some(format!(r"\b{}\b", body.join(&format!("{sep}?"))))
    }
}
