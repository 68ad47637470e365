//! Status command implementation
//!
//! Reports incremental-run state from the destination's control table:
//! how many row markers exist and which run wrote most recently.

use crate::adapters::postgres::{PgClient, PostgresDestination};
use crate::adapters::traits::{DestinationDatabase, MarkerStore};
use crate::config::load_config;
use crate::dictionary::Dictionary;
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {e}");
                return Ok(2);
            }
        };

        let dictionary = Dictionary::load(
            &config.dictionary.path,
            config.dictionary.delimiter_char(),
        )?;

        let client = PgClient::new(
            &config.destination.connection_string,
            config.destination.schema.clone(),
            config.destination.max_connections,
            config.destination.connection_timeout_seconds,
        )?;
        let destination =
            PostgresDestination::new(client, config.destination.control_table.clone(), &dictionary);

        destination.test_connection().await?;

        let marker_count = destination.count_markers().await?;
        println!("Destination control table: {}", config.destination.control_table);
        println!("  Row markers: {marker_count}");

        match destination.latest_run().await? {
            Some((run_id, at)) => {
                println!("  Latest run:  {run_id}");
                println!("  Last write:  {}", at.to_rfc3339());
            }
            None => {
                println!("  No runs recorded yet.");
            }
        }

        Ok(0)
    }
}
