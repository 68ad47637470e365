//! Pipeline coordinator - main orchestrator for the de-identification run
//!
//! Sequences the two-phase per-patient protocol over a bounded worker
//! pool, processes system tables as their own units, drives full vs
//! incremental change detection, and assembles the run summary.
//!
//! Concurrency is partitioned by patient: each unit of work is exactly
//! one patient's gather-then-transform sequence, so workers share only
//! the read-only dictionary, rule policy, and hash keys.

use crate::adapters::postgres::{PgClient, PostgresDestination, PostgresSource};
use crate::adapters::retry::with_retry;
use crate::adapters::traits::{DestinationDatabase, MarkerStore, SourceDatabase};
use crate::config::VeilConfig;
use crate::dictionary::{Dictionary, TablePolicy};
use crate::domain::ids::RunId;
use crate::domain::{Pid, Result, SourceRow, VeilError};
use crate::pipeline::gather::gather_identifier_set;
use crate::pipeline::marker::RowMarker;
use crate::pipeline::summary::{RowErrorReport, RunSummary, UnitOutcome};
use crate::pseudonym::{PseudonymHasher, PseudonymKeys};
use crate::scrub::{ScrubRules, Scrubber, ScrubberBuilder};
use crate::transform::{row_content_hash, transform_row};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Pipeline coordinator
pub struct PipelineCoordinator {
    config: VeilConfig,
    dictionary: Arc<Dictionary>,
    hasher: Arc<PseudonymHasher>,
    scrubber_builder: Arc<ScrubberBuilder>,
    sources: Vec<Arc<dyn SourceDatabase>>,
    destination: Arc<dyn DestinationDatabase>,
    markers: Arc<dyn MarkerStore>,
    run_id: RunId,
}

impl PipelineCoordinator {
    /// Assemble a coordinator from pre-built collaborators.
    ///
    /// Used directly by tests with in-memory adapters; production code
    /// goes through [`from_config`](Self::from_config).
    pub fn new(
        config: VeilConfig,
        dictionary: Dictionary,
        sources: Vec<Arc<dyn SourceDatabase>>,
        destination: Arc<dyn DestinationDatabase>,
        markers: Arc<dyn MarkerStore>,
    ) -> Result<Self> {
        let keys = PseudonymKeys::new(
            config.keys.primary_key.clone(),
            config.keys.master_key.clone(),
        );
        keys.validate().map_err(VeilError::Configuration)?;

        let rules = match &config.scrub.rules_path {
            Some(path) => ScrubRules::from_file(path),
            None => ScrubRules::default_rules(),
        }
        .map_err(|e| VeilError::Configuration(format!("Invalid scrub rules: {e}")))?;

        Ok(Self {
            config,
            dictionary: Arc::new(dictionary),
            hasher: Arc::new(PseudonymHasher::new(keys)),
            scrubber_builder: Arc::new(ScrubberBuilder::new(rules)),
            sources,
            destination,
            markers,
            run_id: RunId::generate(),
        })
    }

    /// Build a coordinator with PostgreSQL adapters from configuration.
    pub fn from_config(config: VeilConfig) -> Result<Self> {
        let dictionary = Dictionary::load(
            &config.dictionary.path,
            config.dictionary.delimiter_char(),
        )?;

        let mut sources: Vec<Arc<dyn SourceDatabase>> = Vec::with_capacity(config.sources.len());
        for source_config in &config.sources {
            let client = PgClient::new(
                &source_config.connection_string,
                source_config.schema.clone(),
                source_config.max_connections,
                source_config.connection_timeout_seconds,
            )?;
            sources.push(Arc::new(PostgresSource::new(
                source_config.name.clone(),
                client,
            )));
        }

        let dest_client = PgClient::new(
            &config.destination.connection_string,
            config.destination.schema.clone(),
            config.destination.max_connections,
            config.destination.connection_timeout_seconds,
        )?;
        let destination = Arc::new(PostgresDestination::new(
            dest_client,
            config.destination.control_table.clone(),
            &dictionary,
        ));

        Self::new(
            config,
            dictionary,
            sources,
            destination.clone(),
            destination,
        )
    }

    /// The identifier of this run
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Execute the run.
    ///
    /// 1. Validates the dictionary against each source's introspected
    ///    schema
    /// 2. Ensures destination tables and the control table exist
    /// 3. Processes each source's patients through the bounded worker
    ///    pool (two-phase per patient) and its system tables as
    ///    independent units
    /// 4. Emits the run summary
    ///
    /// A shutdown signal stops new patients from starting; in-flight
    /// patients finish their current phase before the run winds down.
    pub async fn execute(&self, shutdown: watch::Receiver<bool>) -> Result<RunSummary> {
        let start_time = Instant::now();
        let mut summary = RunSummary::new(self.run_id, self.config.pipeline.mode.clone());

        tracing::info!(
            run_id = %self.run_id,
            mode = %self.config.pipeline.mode,
            sources = self.sources.len(),
            dry_run = self.config.application.dry_run,
            "Starting de-identification run"
        );

        // A dictionary that disagrees with the live schema must stop the
        // run before any row is read.
        for source in &self.sources {
            let schema = with_retry(&self.config.pipeline.retry, "introspect schema", || {
                source.introspect_schema()
            })
            .await?;
            self.dictionary.validate_against_schema(&schema)?;
        }

        if !self.config.application.dry_run {
            self.destination
                .ensure_destination_tables(&self.dictionary)
                .await?;
            self.destination.ensure_control_table().await?;
        }

        for source in &self.sources {
            let policies: Vec<TablePolicy> = self
                .dictionary
                .table_policies()
                .iter()
                .filter(|p| p.source_db == source.name())
                .cloned()
                .collect();

            if policies.is_empty() {
                tracing::warn!(
                    source = source.name(),
                    "Dictionary declares no tables for this source"
                );
                continue;
            }

            let patient_policies: Vec<TablePolicy> =
                policies.iter().filter(|p| !p.is_system()).cloned().collect();
            let system_policies: Vec<TablePolicy> =
                policies.iter().filter(|p| p.is_system()).cloned().collect();

            if !patient_policies.is_empty() {
                let aborted = self
                    .process_patients(source, &patient_policies, &shutdown, &mut summary)
                    .await?;
                if aborted {
                    summary = summary.with_duration(start_time.elapsed());
                    summary.log_summary();
                    return Ok(summary);
                }
            }

            for policy in &system_policies {
                if *shutdown.borrow() {
                    tracing::info!("Shutdown requested; skipping remaining system tables");
                    break;
                }
                match self.process_system_table(source.as_ref(), policy).await {
                    Ok(outcome) => {
                        summary.system_tables_processed += 1;
                        summary.absorb(outcome);
                    }
                    Err(e) => {
                        tracing::error!(
                            table = %policy.source_table,
                            error = %e,
                            "System table failed"
                        );
                        summary.set_fatal(e.to_string());
                        summary = summary.with_duration(start_time.elapsed());
                        summary.log_summary();
                        return Ok(summary);
                    }
                }
            }
        }

        summary = summary.with_duration(start_time.elapsed());
        summary.log_summary();
        Ok(summary)
    }

    /// Drive the patient worker pool for one source.
    ///
    /// Returns `true` when a fatal error aborted the run.
    async fn process_patients(
        &self,
        source: &Arc<dyn SourceDatabase>,
        policies: &[TablePolicy],
        shutdown: &watch::Receiver<bool>,
        summary: &mut RunSummary,
    ) -> Result<bool> {
        let pids = with_retry(&self.config.pipeline.retry, "list patient ids", || {
            source.list_patient_ids(policies)
        })
        .await?;

        summary.total_patients += pids.len();
        tracing::info!(
            source = source.name(),
            patients = pids.len(),
            "Processing patients"
        );

        let mut work = stream::iter(pids)
            .map(|pid| {
                let source = source.clone();
                let shutdown = shutdown.clone();
                async move {
                    if *shutdown.borrow() {
                        return Ok(None);
                    }
                    self.process_patient(source.as_ref(), policies, &pid, &shutdown)
                        .await
                }
            })
            .buffer_unordered(self.config.pipeline.parallel_patients);

        while let Some(result) = work.next().await {
            match result {
                Ok(Some(outcome)) => {
                    summary.patients_processed += 1;
                    summary.absorb(outcome);
                }
                Ok(None) => {
                    // Not started, or stopped between phases
                }
                Err(e) => {
                    // Dropping the stream cancels patients that have not
                    // yet produced output; the destination stays at the
                    // last committed patient.
                    summary.set_fatal(e.to_string());
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    /// Two-phase protocol for one patient.
    ///
    /// Returns `Ok(None)` if shutdown interrupted the patient between
    /// phases (nothing was written for them).
    async fn process_patient(
        &self,
        source: &dyn SourceDatabase,
        policies: &[TablePolicy],
        pid: &Pid,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<Option<UnitOutcome>> {
        // Phase 1: gather, in full, before any transform
        let identifier_set =
            gather_identifier_set(source, policies, pid, &self.config.pipeline.retry).await?;

        let scrubber = self
            .scrubber_builder
            .build(&identifier_set)
            .map_err(|e| VeilError::Configuration(format!("Scrubber compilation failed: {e}")))?;

        if *shutdown.borrow() {
            tracing::info!(pid = %pid, "Shutdown between phases; patient not written");
            return Ok(None);
        }

        // Phase 2: re-read and transform every table's rows for this
        // patient, committing as one batch
        let mut outcome = UnitOutcome::default();
        let mut batch = Vec::new();
        let mut new_markers = Vec::new();

        for policy in policies {
            let rows = with_retry(&self.config.pipeline.retry, "fetch patient rows", || {
                source.fetch_patient_rows(policy, pid)
            })
            .await?;

            self.transform_rows(policy, &rows, Some(&scrubber), &mut outcome, &mut batch, &mut new_markers)
                .await?;
        }

        self.commit_batch(&batch, &new_markers, &mut outcome).await?;
        Ok(Some(outcome))
    }

    /// Transform a system table (no patient grouping, no scrubber)
    async fn process_system_table(
        &self,
        source: &dyn SourceDatabase,
        policy: &TablePolicy,
    ) -> Result<UnitOutcome> {
        tracing::info!(table = %policy.source_table, "Processing system table");

        let rows = with_retry(&self.config.pipeline.retry, "fetch system table", || {
            source.fetch_table_rows(policy)
        })
        .await?;

        let mut outcome = UnitOutcome::default();
        let mut batch = Vec::new();
        let mut new_markers = Vec::new();

        self.transform_rows(policy, &rows, None, &mut outcome, &mut batch, &mut new_markers)
            .await?;
        self.commit_batch(&batch, &new_markers, &mut outcome).await?;
        Ok(outcome)
    }

    /// Transform a slice of rows under one table policy, honoring
    /// incremental skip logic and the error taxonomy.
    async fn transform_rows(
        &self,
        policy: &TablePolicy,
        rows: &[SourceRow],
        scrubber: Option<&Scrubber>,
        outcome: &mut UnitOutcome,
        batch: &mut Vec<crate::domain::TransformedRow>,
        new_markers: &mut Vec<RowMarker>,
    ) -> Result<()> {
        let row_keys: Vec<String> = rows
            .iter()
            .map(|row| {
                self.hasher
                    .hash_row_identity(&row.source_db, &row.table, &row.row_id)
                    .into_inner()
            })
            .collect();

        let existing = if self.config.pipeline.is_incremental() {
            self.markers.load_markers(&row_keys).await?
        } else {
            Default::default()
        };

        for (row, row_key) in rows.iter().zip(row_keys) {
            let content_hash = row_content_hash(row);

            if let Some(marker) = existing.get(&row_key) {
                if marker.is_unchanged(&content_hash) {
                    // Unchanged since the prior run: not re-hashed, not
                    // re-scrubbed, not re-written
                    outcome.rows_skipped_unchanged += 1;
                    continue;
                }
            }

            match transform_row(policy, row, scrubber, &self.hasher) {
                Ok(Some(mut transformed)) => {
                    transformed.source_row_id = row_key.clone();
                    batch.push(transformed);
                    new_markers.push(RowMarker::new(row_key, content_hash, self.run_id));
                }
                Ok(None) => {
                    // Every column OMIT: nothing to write
                }
                Err(VeilError::RowTransform(e)) => {
                    outcome.record_row_error(RowErrorReport {
                        table: policy.source_table.clone(),
                        row_key,
                        message: e.to_string(),
                    });
                }
                Err(fatal) => return Err(fatal),
            }
        }

        Ok(())
    }

    /// Write one unit's batch and its markers, unless dry-running
    async fn commit_batch(
        &self,
        batch: &[crate::domain::TransformedRow],
        new_markers: &[RowMarker],
        outcome: &mut UnitOutcome,
    ) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        if self.config.application.dry_run {
            outcome.rows_written += batch.len();
            return Ok(());
        }

        let write_outcome = with_retry(&self.config.pipeline.retry, "write batch", || {
            self.destination.write_rows(batch)
        })
        .await?;
        outcome.rows_written += write_outcome.written;

        self.markers.save_markers(new_markers).await?;
        Ok(())
    }
}
