//! Configuration management for Veil.
//!
//! TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! Veil uses a TOML configuration file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - Default values for optional settings
//! - Secrets held in zeroized memory ([`SecretString`])
//! - Comprehensive validation before a run starts
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use veil::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("veil.toml")?;
//!
//! println!("Sources: {}", config.sources.len());
//! println!("Run mode: {}", config.pipeline.mode);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - log level, dry-run flag
//! - [`SourceConfig`] - one entry per source database
//! - [`DestinationConfig`] - destination database and control table
//! - [`DictionaryConfig`] - dictionary file path and delimiter
//! - [`PipelineConfig`] - run mode, concurrency, retry policy
//! - [`KeysConfig`] - pseudonym hashing keys (via `${ENV}` substitution)
//! - [`ScrubConfig`] - scrub rule policy override
//! - [`LoggingConfig`] - local file logging

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::load_config;
pub use schema::{
    ApplicationConfig, DestinationConfig, DictionaryConfig, Environment, KeysConfig,
    LoggingConfig, PipelineConfig, RetryConfig, ScrubConfig, SourceConfig, VeilConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
