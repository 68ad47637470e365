//! Database abstraction traits
//!
//! These traits are the seams between the pipeline and its databases.
//! The orchestrator only ever sees trait objects, so the PostgreSQL
//! adapters can be swapped for in-memory implementations in tests.

use crate::dictionary::{Dictionary, SourceSchema, TablePolicy};
use crate::domain::ids::RunId;
use crate::domain::{Pid, Result, SourceRow, TransformedRow};
use crate::pipeline::marker::RowMarker;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Result of writing a batch of transformed rows
#[derive(Debug, Clone, Default)]
pub struct WriteOutcome {
    /// Number of rows successfully written
    pub written: usize,

    /// Details of rows that failed to write
    pub failures: Vec<WriteFailure>,
}

/// Details of one failed row write
#[derive(Debug, Clone)]
pub struct WriteFailure {
    /// Row-identity digest of the failed row
    pub row_key: String,

    /// Error message
    pub error: String,
}

/// Read access to one source database
#[async_trait]
pub trait SourceDatabase: Send + Sync {
    /// Configured name of this source (matched against the dictionary's
    /// source_db column)
    fn name(&self) -> &str;

    /// Test the connection
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::VeilError::Connectivity`] if unreachable.
    async fn test_connection(&self) -> Result<()>;

    /// Introspect the source catalog for dictionary validation
    async fn introspect_schema(&self) -> Result<SourceSchema>;

    /// List the distinct patient identifiers across all patient tables
    /// covered by the given policies
    async fn list_patient_ids(&self, policies: &[TablePolicy]) -> Result<Vec<Pid>>;

    /// Fetch all of one patient's rows from one table
    async fn fetch_patient_rows(&self, policy: &TablePolicy, pid: &Pid) -> Result<Vec<SourceRow>>;

    /// Fetch every row of a system table
    async fn fetch_table_rows(&self, policy: &TablePolicy) -> Result<Vec<SourceRow>>;
}

/// Write access to the destination database
#[async_trait]
pub trait DestinationDatabase: Send + Sync {
    /// Test the connection
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::VeilError::Connectivity`] if unreachable.
    async fn test_connection(&self) -> Result<()>;

    /// Ensure every destination table declared by the dictionary exists,
    /// creating tables and requested indexes if necessary
    async fn ensure_destination_tables(&self, dictionary: &Dictionary) -> Result<()>;

    /// Ensure the control table for row markers exists
    async fn ensure_control_table(&self) -> Result<()>;

    /// Write a batch of transformed rows in one transaction.
    ///
    /// The batch is committed atomically; on a crash mid-run the
    /// destination is left in a defined "up to last committed batch"
    /// state, never with a half-transformed row.
    async fn write_rows(&self, rows: &[TransformedRow]) -> Result<WriteOutcome>;
}

/// Persistence for incremental-run row markers
#[async_trait]
pub trait MarkerStore: Send + Sync {
    /// Load the markers for a set of row keys; absent keys are simply
    /// missing from the returned map
    async fn load_markers(&self, row_keys: &[String]) -> Result<HashMap<String, RowMarker>>;

    /// Upsert a batch of markers
    async fn save_markers(&self, markers: &[RowMarker]) -> Result<()>;

    /// Total number of stored markers
    async fn count_markers(&self) -> Result<u64>;

    /// The most recent run recorded in the marker table, if any
    async fn latest_run(&self) -> Result<Option<(RunId, DateTime<Utc>)>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_outcome_default() {
        let outcome = WriteOutcome::default();
        assert_eq!(outcome.written, 0);
        assert!(outcome.failures.is_empty());
    }
}
