//! Init command implementation
//!
//! Writes a commented template configuration file to get a new
//! deployment started.

use clap::Args;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Output path for the configuration file
    #[arg(short, long, default_value = "veil.toml")]
    pub output: String,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

const TEMPLATE: &str = r#"# Veil configuration
# Secrets are substituted from the environment with ${VAR} syntax.

environment = "development"

[application]
log_level = "info"
dry_run = false

[[sources]]
name = "ehr"
connection_string = "${VEIL_SOURCE_EHR_URL}"
schema = "public"
read_only = true

[destination]
connection_string = "${VEIL_DESTINATION_URL}"
schema = "public"
control_table = "veil_row_markers"

[dictionary]
path = "dictionary.tsv"
delimiter = "\t"

[pipeline]
mode = "incremental"
parallel_patients = 8
shutdown_timeout_secs = 30

[pipeline.retry]
max_retries = 3
initial_delay_ms = 1000
max_delay_ms = 30000
backoff_multiplier = 2.0

[keys]
# Two independent keys. Rotating a key regenerates all pseudonyms in
# that scope by design.
primary_key = "${VEIL_PRIMARY_KEY}"
master_key = "${VEIL_MASTER_KEY}"

[scrub]
# Uncomment to override the embedded scrub rule policy.
# rules_path = "scrub_rules.toml"

[logging]
local_enabled = true
local_path = "/var/log/veil"
local_rotation = "daily"
json_format = false
"#;

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        let path = Path::new(&self.output);

        if path.exists() && !self.force {
            eprintln!(
                "{} already exists; use --force to overwrite",
                path.display()
            );
            return Ok(2);
        }

        std::fs::write(path, TEMPLATE)?;
        println!("Wrote {}", path.display());
        println!("Set VEIL_PRIMARY_KEY and VEIL_MASTER_KEY before running.");
        Ok(0)
    }
}
