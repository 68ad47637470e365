//! Run summary and reporting
//!
//! Tracks what a pipeline execution did and emits the completion report.
//! Data-quality skips and safety aborts are reported through separate
//! fields: "rows skipped due to data error" is a data-quality signal,
//! "run aborted" is a safety signal, and the two are never conflated.

use crate::domain::ids::RunId;
use std::time::Duration;

/// Counts produced by processing one unit of work (one patient, or one
/// system table)
#[derive(Debug, Clone, Default)]
pub struct UnitOutcome {
    /// Rows written to the destination
    pub rows_written: usize,

    /// Rows skipped because their content hash matched the stored marker
    pub rows_skipped_unchanged: usize,

    /// Rows skipped due to a recoverable data error
    pub rows_skipped_error: usize,

    /// Reports for each skipped-with-error row
    pub row_errors: Vec<RowErrorReport>,
}

impl UnitOutcome {
    /// Record one recoverable row error
    pub fn record_row_error(&mut self, report: RowErrorReport) {
        self.rows_skipped_error += 1;
        self.row_errors.push(report);
    }
}

/// Context for one skipped row, without raw values
#[derive(Debug, Clone)]
pub struct RowErrorReport {
    /// Source table the row came from
    pub table: String,

    /// Row-identity digest for traceability
    pub row_key: String,

    /// Error message
    pub message: String,
}

/// Summary of one pipeline run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Run identifier
    pub run_id: RunId,

    /// Run mode ("full" or "incremental")
    pub mode: String,

    /// Number of patients discovered in the sources
    pub total_patients: usize,

    /// Patients fully processed (both phases complete)
    pub patients_processed: usize,

    /// System tables processed
    pub system_tables_processed: usize,

    /// Rows written to the destination
    pub rows_written: usize,

    /// Rows skipped as unchanged (incremental mode)
    pub rows_skipped_unchanged: usize,

    /// Rows skipped due to recoverable data errors
    pub rows_skipped_error: usize,

    /// Per-row error reports
    pub row_errors: Vec<RowErrorReport>,

    /// The fatal error that aborted the run, if any
    pub fatal_error: Option<String>,

    /// Duration of the run
    pub duration: Duration,
}

impl RunSummary {
    /// Create an empty summary for a run
    pub fn new(run_id: RunId, mode: impl Into<String>) -> Self {
        Self {
            run_id,
            mode: mode.into(),
            total_patients: 0,
            patients_processed: 0,
            system_tables_processed: 0,
            rows_written: 0,
            rows_skipped_unchanged: 0,
            rows_skipped_error: 0,
            row_errors: Vec::new(),
            fatal_error: None,
            duration: Duration::from_secs(0),
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Fold one unit of work into the summary
    pub fn absorb(&mut self, outcome: UnitOutcome) {
        self.rows_written += outcome.rows_written;
        self.rows_skipped_unchanged += outcome.rows_skipped_unchanged;
        self.rows_skipped_error += outcome.rows_skipped_error;
        self.row_errors.extend(outcome.row_errors);
    }

    /// Record the fatal error that aborted the run
    pub fn set_fatal(&mut self, message: impl Into<String>) {
        self.fatal_error = Some(message.into());
    }

    /// Whether the run was aborted by a fatal error
    pub fn is_aborted(&self) -> bool {
        self.fatal_error.is_some()
    }

    /// Whether the run completed with no errors of any kind
    pub fn is_clean(&self) -> bool {
        !self.is_aborted() && self.rows_skipped_error == 0
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            run_id = %self.run_id,
            mode = %self.mode,
            total_patients = self.total_patients,
            patients_processed = self.patients_processed,
            system_tables = self.system_tables_processed,
            rows_written = self.rows_written,
            rows_skipped_unchanged = self.rows_skipped_unchanged,
            rows_skipped_error = self.rows_skipped_error,
            duration_secs = self.duration.as_secs(),
            "Run completed"
        );

        if self.rows_skipped_error > 0 {
            tracing::warn!(
                count = self.rows_skipped_error,
                "Rows skipped due to data errors"
            );
            for report in &self.row_errors {
                tracing::warn!(
                    table = %report.table,
                    row_key = %report.row_key,
                    message = %report.message,
                    "Row skipped"
                );
            }
        }

        if let Some(ref fatal) = self.fatal_error {
            tracing::error!(
                error = %fatal,
                "Run aborted due to configuration or leakage risk"
            );
        }
    }
}
