//! Run command implementation
//!
//! Executes the de-identification pipeline: loads configuration and the
//! dictionary, assembles the coordinator, and reports the run summary.

use crate::config::load_config;
use crate::pipeline::PipelineCoordinator;
use clap::Args;
use std::io::Write;
use tokio::sync::watch;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Dry run mode - transform but skip destination writes
    #[arg(long)]
    pub dry_run: bool,

    /// Override run mode (full or incremental)
    #[arg(long)]
    pub mode: Option<String>,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting run command");

        let mut config = match load_config(config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "Configuration loading failed");
                eprintln!("Error: {e}");
                return Ok(2);
            }
        };

        // Apply CLI overrides
        if let Some(mode) = &self.mode {
            tracing::info!(mode = %mode, "Overriding run mode from CLI");
            config.pipeline.mode = mode.clone();
        }
        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        if config.application.dry_run {
            println!("DRY RUN MODE - no data will be written to the destination");
            println!();
        }

        // Confirmation prompt (unless --yes or dry-run)
        if !self.yes && !config.application.dry_run {
            println!("Run configuration:");
            println!("  Mode: {}", config.pipeline.mode);
            println!(
                "  Sources: {}",
                config
                    .sources
                    .iter()
                    .map(|s| s.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            println!("  Dictionary: {}", config.dictionary.path);
            println!("  Parallel patients: {}", config.pipeline.parallel_patients);
            println!();
            print!("Proceed? [y/N] ");
            std::io::stdout().flush()?;

            let mut answer = String::new();
            std::io::stdin().read_line(&mut answer)?;
            if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
                println!("Aborted.");
                return Ok(0);
            }
        }

        let shutdown_timeout = std::time::Duration::from_secs(config.pipeline.shutdown_timeout_secs);

        let coordinator = match PipelineCoordinator::from_config(config) {
            Ok(coordinator) => coordinator,
            Err(e) => {
                tracing::error!(error = %e, "Pipeline initialization failed");
                eprintln!("Error: {e}");
                return Ok(2);
            }
        };

        // In-flight patients get a bounded grace period once a shutdown
        // signal arrives; past that the run is abandoned where it stands
        // (the destination holds everything up to the last committed
        // patient).
        let mut grace_rx = shutdown_signal.clone();
        let run = coordinator.execute(shutdown_signal);
        tokio::pin!(run);

        let summary = tokio::select! {
            summary = &mut run => summary?,
            _ = async {
                while !*grace_rx.borrow() {
                    if grace_rx.changed().await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
                tokio::time::sleep(shutdown_timeout).await;
            } => {
                tracing::error!(
                    timeout_secs = shutdown_timeout.as_secs(),
                    "Shutdown grace period elapsed before in-flight patients finished"
                );
                eprintln!(
                    "Shutdown grace period of {}s elapsed; destination holds rows up to the last committed patient.",
                    shutdown_timeout.as_secs()
                );
                return Ok(4);
            }
        };

        println!();
        println!("Run {} ({})", summary.run_id, summary.mode);
        println!("  Patients processed:     {}/{}", summary.patients_processed, summary.total_patients);
        println!("  System tables:          {}", summary.system_tables_processed);
        println!("  Rows written:           {}", summary.rows_written);
        println!("  Rows skipped unchanged: {}", summary.rows_skipped_unchanged);
        println!("  Rows skipped (errors):  {}", summary.rows_skipped_error);
        println!("  Duration:               {}s", summary.duration.as_secs());

        if let Some(ref fatal) = summary.fatal_error {
            println!();
            println!("RUN ABORTED: {fatal}");
            return Ok(4);
        }

        if summary.rows_skipped_error > 0 {
            println!();
            println!(
                "Completed with {} row(s) skipped due to data errors; see the log for details.",
                summary.rows_skipped_error
            );
            return Ok(1);
        }

        Ok(0)
    }
}
