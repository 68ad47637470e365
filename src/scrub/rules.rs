//! Scrub rule policy
//!
//! The set of date/number format variants a scrubber covers is a policy
//! choice with real re-identification-risk consequences, so it is data,
//! not code: a TOML table loaded at startup (with an embedded default),
//! enabling each normalization to be unit tested independently.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// General thresholds applied across identifier kinds
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralRules {
    /// Identifier values shorter than this are excluded from matching
    #[serde(default = "default_min_token_length")]
    pub min_token_length: usize,

    /// Numeric identifiers need at least this many digits to be matched
    /// with separator tolerance
    #[serde(default = "default_min_digit_count")]
    pub min_digit_count: usize,
}

impl Default for GeneralRules {
    fn default() -> Self {
        Self {
            min_token_length: default_min_token_length(),
            min_digit_count: default_min_digit_count(),
        }
    }
}

/// Date parsing and variant-rendering formats
#[derive(Debug, Clone, Deserialize)]
pub struct DateRules {
    /// chrono format strings tried when parsing a gathered date value
    pub input_formats: Vec<String>,

    /// chrono format strings rendered into literal match variants
    pub output_formats: Vec<String>,
}

/// Numeric identifier matching rules
#[derive(Debug, Clone, Deserialize)]
pub struct NumberRules {
    /// Separators tolerated between digits
    pub separators: Vec<String>,
}

/// The full scrub rule policy
#[derive(Debug, Clone, Deserialize)]
pub struct ScrubRules {
    /// General thresholds
    #[serde(default)]
    pub general: GeneralRules,

    /// Date variant policy
    pub dates: DateRules,

    /// Number variant policy
    pub numbers: NumberRules,
}

impl ScrubRules {
    /// The embedded default policy
    pub fn default_rules() -> Result<Self> {
        let default_toml = include_str!("../../rules/scrub_rules.toml");
        Self::from_toml(default_toml)
    }

    /// Load a policy override from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read scrub rules: {}", path.as_ref().display())
        })?;
        Self::from_toml(&content)
    }

    /// Parse a policy from TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        let rules: ScrubRules =
            toml::from_str(content).context("Failed to parse scrub rules TOML")?;
        rules.validate()?;
        Ok(rules)
    }

    /// Reject policies that cannot produce a safe scrubber
    fn validate(&self) -> Result<()> {
        if self.dates.input_formats.is_empty() {
            anyhow::bail!("scrub rules must declare at least one date input format");
        }
        if self.dates.output_formats.is_empty() {
            anyhow::bail!("scrub rules must declare at least one date output format");
        }
        if self.general.min_token_length == 0 {
            anyhow::bail!("min_token_length must be at least 1");
        }
        Ok(())
    }

    /// The character class matching one optional separator between digits
    pub fn separator_class(&self) -> String {
        let mut class = String::from("[");
        for sep in &self.numbers.separators {
            for c in sep.chars() {
                if c == ' ' {
                    class.push_str(r"\s");
                } else {
                    class.push_str(&regex::escape(&c.to_string()));
                }
            }
        }
        class.push(']');
        class
    }
}

fn default_min_token_length() -> usize {
    3
}

fn default_min_digit_count() -> usize {
    6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_load() {
        let rules = ScrubRules::default_rules().unwrap();
        assert!(rules.general.min_token_length >= 1);
        assert!(!rules.dates.output_formats.is_empty());
        assert!(!rules.numbers.separators.is_empty());
    }

    #[test]
    fn test_default_rules_cover_common_date_shapes() {
        let rules = ScrubRules::default_rules().unwrap();
        // Day-first, month-first and ISO orderings must all be present
        assert!(rules.dates.output_formats.iter().any(|f| f == "%d/%m/%Y"));
        assert!(rules.dates.output_formats.iter().any(|f| f == "%m/%d/%Y"));
        assert!(rules.dates.output_formats.iter().any(|f| f == "%Y-%m-%d"));
        // Month-name renderings
        assert!(rules.dates.output_formats.iter().any(|f| f.contains("%b")));
        assert!(rules.dates.output_formats.iter().any(|f| f.contains("%B")));
    }

    #[test]
    fn test_empty_output_formats_rejected() {
        let toml = r#"
            [dates]
            input_formats = ["%Y-%m-%d"]
            output_formats = []
            [numbers]
            separators = [" "]
        "#;
        assert!(ScrubRules::from_toml(toml).is_err());
    }

    #[test]
    fn test_zero_min_token_length_rejected() {
        let toml = r#"
            [general]
            min_token_length = 0
            [dates]
            input_formats = ["%Y-%m-%d"]
            output_formats = ["%Y-%m-%d"]
            [numbers]
            separators = [" "]
        "#;
        assert!(ScrubRules::from_toml(toml).is_err());
    }

    #[test]
    fn test_separator_class() {
        let rules = ScrubRules::default_rules().unwrap();
        let class = rules.separator_class();
        assert!(class.starts_with('['));
        assert!(class.ends_with(']'));
        assert!(class.contains(r"\s"));
        assert!(class.contains('-'));
    }
}
