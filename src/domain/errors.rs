//! Domain error types
//!
//! This module defines the error hierarchy for Veil. All errors are
//! domain-specific and don't expose third-party types.
//!
//! The taxonomy separates safety-critical failures from recoverable ones:
//! configuration and dictionary errors are fatal before the run starts,
//! a missing scrubber is fatal mid-run (identifier-leak risk), and
//! per-row transform errors are recorded and skipped.

use thiserror::Error;

/// Main Veil error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum VeilError {
    /// Configuration-related errors (malformed config file, missing keys).
    /// Fatal: the run must not start.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Data dictionary errors (parse failures, invariant violations).
    /// Fatal: a malformed dictionary is an information-leak risk.
    #[error("Data dictionary error: {0}")]
    Dictionary(#[from] DictionaryError),

    /// A transform required a scrubber that does not exist for the owning
    /// patient. Fatal: the run halts immediately rather than writing the
    /// row verbatim.
    #[error(
        "No scrubber available for patient while transforming {table}.{column}; \
         halting to prevent identifier leakage"
    )]
    ScrubUnavailable {
        /// Source table being transformed
        table: String,
        /// Column marked for scrubbing
        column: String,
    },

    /// Per-row transform errors (datatype mismatch, unexpected null).
    /// Recovered locally: the row is skipped and the run continues.
    #[error("Row transform error: {0}")]
    RowTransform(#[from] RowTransformError),

    /// Source or destination unreachable. Retried with bounded backoff,
    /// then fatal if persistent.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Database-related errors (query or write failures)
    #[error("Database error: {0}")]
    Database(String),

    /// Run-state (marker) management errors
    #[error("State management error: {0}")]
    State(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl VeilError {
    /// Whether this error must abort the run.
    ///
    /// Fatal errors are configuration/dictionary problems and leakage
    /// risks; they are never conflated with per-row data-quality errors.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::RowTransform(_))
    }
}

/// Data dictionary errors
///
/// Violations detected while parsing or validating the dictionary.
/// Every variant is fatal: the pipeline never starts with a dictionary
/// that could mis-route an identifying column.
#[derive(Debug, Error)]
pub enum DictionaryError {
    /// Dictionary file could not be read
    #[error("Failed to read dictionary file {path}: {reason}")]
    FileUnreadable { path: String, reason: String },

    /// Missing or malformed header row
    #[error("Invalid dictionary header: {0}")]
    InvalidHeader(String),

    /// A row has the wrong number of fields
    #[error("Line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// Unknown decision keyword
    #[error("Line {line}: unknown decision '{value}'")]
    UnknownDecision { line: usize, value: String },

    /// Unknown source datatype keyword
    #[error("Line {line}: unknown datatype '{value}'")]
    UnknownDatatype { line: usize, value: String },

    /// Unknown identifier kind keyword
    #[error("Line {line}: unknown identifier kind '{value}'")]
    UnknownIdentifierKind { line: usize, value: String },

    /// Duplicate (source_db, source_table, source_field) key
    #[error("Duplicate dictionary entry for {db}.{table}.{field}")]
    DuplicateEntry {
        db: String,
        table: String,
        field: String,
    },

    /// A table declares more than one PRIMARY_PID column
    #[error("Table {db}.{table} declares more than one PRIMARY_PID column")]
    MultiplePrimaryPid { db: String, table: String },

    /// A table declares more than one MASTER_PID column
    #[error("Table {db}.{table} declares more than one MASTER_PID column")]
    MultipleMasterPid { db: String, table: String },

    /// Two entries map to the same destination field
    #[error("Destination field {table}.{field} is mapped more than once")]
    DuplicateDestination { table: String, field: String },

    /// INCLUDE_SCRUBBED on a non-text column
    #[error("{db}.{table}.{field}: INCLUDE_SCRUBBED is only legal on text columns")]
    ScrubbedNonText {
        db: String,
        table: String,
        field: String,
    },

    /// INCLUDE_SCRUBBED in a table with no PRIMARY_PID (no scrubber can
    /// ever be built for its rows)
    #[error("{db}.{table}.{field}: INCLUDE_SCRUBBED in a system table (no PRIMARY_PID column)")]
    ScrubbedSystemTable {
        db: String,
        table: String,
        field: String,
    },

    /// A column flagged as a patient identifier without a declared kind
    #[error("{db}.{table}.{field}: patient identifier column has no identifier kind")]
    IdentifierWithoutKind {
        db: String,
        table: String,
        field: String,
    },

    /// Entry names a column absent from the introspected source schema
    #[error("{db}.{table}.{field} does not exist in the source schema")]
    UnknownSourceColumn {
        db: String,
        table: String,
        field: String,
    },
}

/// Per-row transform errors
///
/// These carry enough context (table, column) to be actionable in the
/// run log without exposing raw values.
#[derive(Debug, Error)]
pub enum RowTransformError {
    /// Value does not match the declared source datatype
    #[error("{table}.{column}: value does not match declared datatype {expected}")]
    DatatypeMismatch {
        table: String,
        column: String,
        expected: String,
    },

    /// Unexpected null in a required field (e.g. a PID column)
    #[error("{table}.{column}: unexpected null in required field")]
    UnexpectedNull { table: String, column: String },

    /// Row is missing a column the dictionary declares
    #[error("{table}: source row is missing declared column '{column}'")]
    MissingColumn { table: String, column: String },
}

// Conversion from std::io::Error
impl From<std::io::Error> for VeilError {
    fn from(err: std::io::Error) -> Self {
        VeilError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for VeilError {
    fn from(err: serde_json::Error) -> Self {
        VeilError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for VeilError {
    fn from(err: toml::de::Error) -> Self {
        VeilError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_veil_error_display() {
        let err = VeilError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_dictionary_error_conversion() {
        let dict_err = DictionaryError::MultiplePrimaryPid {
            db: "ehr".to_string(),
            table: "patients".to_string(),
        };
        let veil_err: VeilError = dict_err.into();
        assert!(matches!(veil_err, VeilError::Dictionary(_)));
        assert!(veil_err.is_fatal());
    }

    #[test]
    fn test_row_transform_error_is_not_fatal() {
        let row_err = RowTransformError::DatatypeMismatch {
            table: "visits".to_string(),
            column: "admitted_at".to_string(),
            expected: "timestamp".to_string(),
        };
        let veil_err: VeilError = row_err.into();
        assert!(!veil_err.is_fatal());
    }

    #[test]
    fn test_scrub_unavailable_is_fatal() {
        let err = VeilError::ScrubUnavailable {
            table: "notes".to_string(),
            column: "clinical_note".to_string(),
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("notes.clinical_note"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let veil_err: VeilError = io_err.into();
        assert!(matches!(veil_err, VeilError::Io(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let veil_err: VeilError = toml_err.into();
        assert!(matches!(veil_err, VeilError::Configuration(_)));
        assert!(veil_err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_veil_error_implements_std_error() {
        let err = VeilError::Database("Test error".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
