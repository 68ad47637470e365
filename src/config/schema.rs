//! Configuration schema types
//!
//! This module defines the configuration structure for Veil. The
//! structure maps one-to-one onto the `veil.toml` file; every section is
//! validated before a run starts, and any violation is fatal.

use crate::config::SecretString;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

/// Runtime environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development environment
    #[default]
    Development,
    /// Staging environment
    Staging,
    /// Production environment
    Production,
}

/// Main Veil configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VeilConfig {
    /// Application-level settings
    pub application: ApplicationConfig,

    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: Environment,

    /// Source database connections, one per source system
    pub sources: Vec<SourceConfig>,

    /// Destination database connection
    pub destination: DestinationConfig,

    /// Data dictionary location and format
    pub dictionary: DictionaryConfig,

    /// Pipeline execution settings
    pub pipeline: PipelineConfig,

    /// Pseudonym hashing keys
    pub keys: KeysConfig,

    /// Scrub rule policy
    #[serde(default)]
    pub scrub: ScrubConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl VeilConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value found.
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;

        if self.sources.is_empty() {
            return Err("at least one [[sources]] entry is required".to_string());
        }
        let mut names = std::collections::HashSet::new();
        for source in &self.sources {
            source.validate(&self.environment)?;
            if !names.insert(source.name.as_str()) {
                return Err(format!("duplicate source name '{}'", source.name));
            }
        }

        self.destination.validate()?;
        self.dictionary.validate()?;
        self.pipeline.validate()?;
        self.keys.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (transform but skip destination writes)
    #[serde(default)]
    pub dry_run: bool,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Retry configuration for transient connectivity failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// One source database connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Source name, referenced by the dictionary's source_db column
    pub name: String,

    /// PostgreSQL connection string
    /// Stored securely in memory and automatically zeroized on drop
    pub connection_string: SecretString,

    /// Schema to read from
    #[serde(default = "default_pg_schema")]
    pub schema: String,

    /// Whether the connection is opened read-only
    #[serde(default = "default_true")]
    pub read_only: bool,

    /// Maximum number of connections in the pool
    #[serde(default = "default_pg_max_connections")]
    pub max_connections: usize,

    /// Connection timeout in seconds
    #[serde(default = "default_pg_connection_timeout_seconds")]
    pub connection_timeout_seconds: u64,
}

impl SourceConfig {
    fn validate(&self, environment: &Environment) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("sources.name cannot be empty".to_string());
        }

        let conn_str = self.connection_string.expose_secret();
        if conn_str.is_empty() {
            return Err(format!(
                "sources.connection_string cannot be empty for '{}'",
                self.name
            ));
        }
        if !conn_str.starts_with("postgresql://") && !conn_str.starts_with("postgres://") {
            return Err(format!(
                "sources.connection_string for '{}' must start with postgresql:// or postgres://",
                self.name
            ));
        }

        // Writes to a source system are never part of this pipeline; in
        // production the connection must be declared read-only.
        if *environment == Environment::Production && !self.read_only {
            return Err(format!(
                "source '{}' must be read_only in production environments",
                self.name
            ));
        }

        if self.max_connections == 0 || self.max_connections > 100 {
            return Err(format!(
                "sources.max_connections must be between 1 and 100, got {}",
                self.max_connections
            ));
        }

        Ok(())
    }
}

/// Destination database connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// PostgreSQL connection string
    /// Stored securely in memory and automatically zeroized on drop
    pub connection_string: SecretString,

    /// Schema to write into
    #[serde(default = "default_pg_schema")]
    pub schema: String,

    /// Control table holding incremental-run row markers
    #[serde(default = "default_control_table")]
    pub control_table: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_pg_max_connections")]
    pub max_connections: usize,

    /// Connection timeout in seconds
    #[serde(default = "default_pg_connection_timeout_seconds")]
    pub connection_timeout_seconds: u64,
}

impl DestinationConfig {
    fn validate(&self) -> Result<(), String> {
        let conn_str = self.connection_string.expose_secret();
        if conn_str.is_empty() {
            return Err("destination.connection_string cannot be empty".to_string());
        }
        if !conn_str.starts_with("postgresql://") && !conn_str.starts_with("postgres://") {
            return Err(
                "destination.connection_string must start with postgresql:// or postgres://"
                    .to_string(),
            );
        }
        if self.control_table.trim().is_empty() {
            return Err("destination.control_table cannot be empty".to_string());
        }
        if self.max_connections == 0 || self.max_connections > 100 {
            return Err(format!(
                "destination.max_connections must be between 1 and 100, got {}",
                self.max_connections
            ));
        }
        Ok(())
    }
}

/// Data dictionary file location and format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionaryConfig {
    /// Path to the delimited dictionary file
    pub path: String,

    /// Field delimiter (single character, tab by default)
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

impl DictionaryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.path.trim().is_empty() {
            return Err("dictionary.path cannot be empty".to_string());
        }
        if self.delimiter.chars().count() != 1 {
            return Err(format!(
                "dictionary.delimiter must be a single character, got '{}'",
                self.delimiter
            ));
        }
        Ok(())
    }

    /// The delimiter as a char
    pub fn delimiter_char(&self) -> char {
        self.delimiter.chars().next().unwrap_or('\t')
    }
}

/// Pipeline execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Run mode (full or incremental)
    #[serde(default = "default_run_mode")]
    pub mode: String,

    /// Number of patients processed concurrently
    #[serde(default = "default_parallel_patients")]
    pub parallel_patients: usize,

    /// Graceful shutdown timeout in seconds. Maximum time to wait for
    /// in-flight patients to finish their current phase before forcing
    /// shutdown.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    /// Retry configuration for connectivity failures
    #[serde(default)]
    pub retry: RetryConfig,
}

impl PipelineConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_modes = ["full", "incremental"];
        if !valid_modes.contains(&self.mode.as_str()) {
            return Err(format!(
                "Invalid pipeline.mode '{}'. Must be one of: {}",
                self.mode,
                valid_modes.join(", ")
            ));
        }

        if self.parallel_patients == 0 || self.parallel_patients > 100 {
            return Err(format!(
                "pipeline.parallel_patients must be between 1 and 100, got {}",
                self.parallel_patients
            ));
        }

        if self.retry.max_retries > 10 {
            return Err(format!(
                "pipeline.retry.max_retries must be <= 10, got {}",
                self.retry.max_retries
            ));
        }

        Ok(())
    }

    /// Whether the run is incremental
    pub fn is_incremental(&self) -> bool {
        self.mode == "incremental"
    }
}

/// Pseudonym hashing keys
///
/// Typically supplied via `${VEIL_PRIMARY_KEY}` / `${VEIL_MASTER_KEY}`
/// environment substitution rather than written into the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysConfig {
    /// Key for PRIMARY_PID -> RID derivation
    /// Stored securely in memory and automatically zeroized on drop
    pub primary_key: SecretString,

    /// Key for MASTER_PID -> MRID derivation
    /// Stored securely in memory and automatically zeroized on drop
    pub master_key: SecretString,
}

impl KeysConfig {
    fn validate(&self) -> Result<(), String> {
        if self.primary_key.expose_secret().is_empty() {
            return Err("keys.primary_key cannot be empty".to_string());
        }
        if self.master_key.expose_secret().is_empty() {
            return Err("keys.master_key cannot be empty".to_string());
        }
        if self.primary_key.expose_secret().as_ref() == self.master_key.expose_secret().as_ref() {
            return Err("keys.primary_key and keys.master_key must be independent".to_string());
        }
        Ok(())
    }
}

/// Scrub rule policy configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScrubConfig {
    /// Optional path to a scrub rules TOML file; the embedded default
    /// policy is used when absent
    #[serde(default)]
    pub rules_path: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Local log file path
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,

    /// Emit JSON-formatted logs
    #[serde(default)]
    pub json_format: bool,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
            json_format: false,
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_retries() -> usize {
    3
}

fn default_run_mode() -> String {
    "incremental".to_string()
}

fn default_parallel_patients() -> usize {
    8
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

fn default_pg_schema() -> String {
    "public".to_string()
}

fn default_control_table() -> String {
    "veil_row_markers".to_string()
}

fn default_pg_max_connections() -> usize {
    10
}

fn default_pg_connection_timeout_seconds() -> u64 {
    30
}

fn default_delimiter() -> String {
    "\t".to_string()
}

fn default_local_path() -> String {
    "/var/log/veil".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;

    fn source(name: &str) -> SourceConfig {
        SourceConfig {
            name: name.to_string(),
            connection_string: secret_string("postgresql://u@h/ehr".to_string()),
            schema: "public".to_string(),
            read_only: true,
            max_connections: 10,
            connection_timeout_seconds: 30,
        }
    }

    fn config() -> VeilConfig {
        VeilConfig {
            application: ApplicationConfig {
                log_level: "info".to_string(),
                dry_run: false,
            },
            environment: Environment::Development,
            sources: vec![source("ehr")],
            destination: DestinationConfig {
                connection_string: secret_string("postgresql://u@h/research".to_string()),
                schema: "public".to_string(),
                control_table: "veil_row_markers".to_string(),
                max_connections: 10,
                connection_timeout_seconds: 30,
            },
            dictionary: DictionaryConfig {
                path: "dictionary.tsv".to_string(),
                delimiter: "\t".to_string(),
            },
            pipeline: PipelineConfig {
                mode: "incremental".to_string(),
                parallel_patients: 8,
                shutdown_timeout_secs: 30,
                retry: RetryConfig::default(),
            },
            keys: KeysConfig {
                primary_key: secret_string("k1".to_string()),
                master_key: secret_string("k2".to_string()),
            },
            scrub: ScrubConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut cfg = config();
        cfg.application.log_level = "verbose".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_no_sources_rejected() {
        let mut cfg = config();
        cfg.sources.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_duplicate_source_names_rejected() {
        let mut cfg = config();
        cfg.sources.push(source("ehr"));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_writable_source_rejected_in_production() {
        let mut cfg = config();
        cfg.environment = Environment::Production;
        cfg.sources[0].read_only = false;
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("read_only"));

        cfg.sources[0].read_only = true;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_empty_primary_key_rejected() {
        let mut cfg = config();
        cfg.keys.primary_key = secret_string(String::new());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_identical_keys_rejected() {
        let mut cfg = config();
        cfg.keys.master_key = secret_string("k1".to_string());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_invalid_mode_rejected() {
        let mut cfg = config();
        cfg.pipeline.mode = "resume".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_parallel_patients_bounds() {
        let mut cfg = config();
        cfg.pipeline.parallel_patients = 0;
        assert!(cfg.validate().is_err());
        cfg.pipeline.parallel_patients = 101;
        assert!(cfg.validate().is_err());
        cfg.pipeline.parallel_patients = 16;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_multichar_delimiter_rejected() {
        let mut cfg = config();
        cfg.dictionary.delimiter = "||".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_delimiter_char() {
        let cfg = config();
        assert_eq!(cfg.dictionary.delimiter_char(), '\t');
    }

    #[test]
    fn test_bad_connection_scheme_rejected() {
        let mut cfg = config();
        cfg.destination.connection_string = secret_string("mysql://u@h/db".to_string());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_is_incremental() {
        let mut cfg = config();
        assert!(cfg.pipeline.is_incremental());
        cfg.pipeline.mode = "full".to_string();
        assert!(!cfg.pipeline.is_incremental());
    }
}
