//! Validate-config command implementation
//!
//! Loads and validates the configuration, the data dictionary, and the
//! scrub rule policy without touching any database. Intended for CI and
//! for dictionary authors to check their edits before a run.

use crate::config::load_config;
use crate::dictionary::Dictionary;
use crate::scrub::ScrubRules;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        println!("Validating {config_path} ...");

        let config = match load_config(config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Configuration invalid: {e}");
                return Ok(2);
            }
        };
        println!("  Configuration: OK ({} source(s))", config.sources.len());

        let dictionary = match Dictionary::load(
            &config.dictionary.path,
            config.dictionary.delimiter_char(),
        ) {
            Ok(dictionary) => dictionary,
            Err(e) => {
                eprintln!("Dictionary invalid: {e}");
                return Ok(2);
            }
        };
        let patient_tables = dictionary
            .table_policies()
            .iter()
            .filter(|p| !p.is_system())
            .count();
        println!(
            "  Dictionary: OK ({} entries, {} tables, {} patient tables)",
            dictionary.entries().len(),
            dictionary.table_policies().len(),
            patient_tables
        );

        let rules = match &config.scrub.rules_path {
            Some(path) => ScrubRules::from_file(path),
            None => ScrubRules::default_rules(),
        };
        match rules {
            Ok(rules) => println!(
                "  Scrub rules: OK ({} date variants)",
                rules.dates.output_formats.len()
            ),
            Err(e) => {
                eprintln!("Scrub rules invalid: {e}");
                return Ok(2);
            }
        }

        println!("All checks passed.");
        Ok(0)
    }
}
