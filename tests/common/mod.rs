//! Shared test fixtures: in-memory source/destination adapters and a
//! minimal configuration, so pipeline behavior can be exercised without
//! a database server.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use veil::adapters::traits::{
    DestinationDatabase, MarkerStore, SourceDatabase, WriteOutcome,
};
use veil::config::{
    secret_string, ApplicationConfig, DestinationConfig, DictionaryConfig, Environment,
    KeysConfig, LoggingConfig, PipelineConfig, RetryConfig, ScrubConfig, SourceConfig, VeilConfig,
};
use veil::dictionary::{Dictionary, SourceSchema, TablePolicy};
use veil::domain::ids::RunId;
use veil::domain::{Pid, Result, SourceRow, TransformedRow};
use veil::pipeline::marker::RowMarker;

/// In-memory source database fed with literal rows
pub struct MemorySource {
    name: String,
    rows: Mutex<Vec<SourceRow>>,
    schema: SourceSchema,
}

impl MemorySource {
    pub fn new(name: &str, dictionary: &Dictionary) -> Self {
        // Schema covers exactly the dictionary's declared columns
        let mut schema = SourceSchema::new();
        for entry in dictionary.entries() {
            schema.add_column(
                entry.source_db.clone(),
                entry.source_table.clone(),
                entry.source_field.clone(),
            );
        }
        Self {
            name: name.to_string(),
            rows: Mutex::new(Vec::new()),
            schema,
        }
    }

    pub fn push_row(&self, row: SourceRow) {
        self.rows.lock().unwrap().push(row);
    }

    pub fn replace_row(&self, row_id: &str, row: SourceRow) {
        let mut rows = self.rows.lock().unwrap();
        rows.retain(|r| !(r.table == row.table && r.row_id == row_id));
        rows.push(row);
    }
}

#[async_trait]
impl SourceDatabase for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn introspect_schema(&self) -> Result<SourceSchema> {
        Ok(self.schema.clone())
    }

    async fn list_patient_ids(&self, policies: &[TablePolicy]) -> Result<Vec<Pid>> {
        let rows = self.rows.lock().unwrap();
        let mut distinct = BTreeSet::new();
        for policy in policies.iter().filter(|p| !p.is_system()) {
            let pid_col = policy.primary_pid_column.as_deref().unwrap();
            for row in rows.iter().filter(|r| r.table == policy.source_table) {
                if let Some(value) = row.get(pid_col) {
                    if !value.is_null() {
                        distinct.insert(value.render());
                    }
                }
            }
        }
        Ok(distinct
            .into_iter()
            .filter_map(|id| Pid::new(id).ok())
            .collect())
    }

    async fn fetch_patient_rows(&self, policy: &TablePolicy, pid: &Pid) -> Result<Vec<SourceRow>> {
        let pid_col = policy.primary_pid_column.as_deref().unwrap();
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|r| r.table == policy.source_table)
            .filter(|r| {
                r.get(pid_col)
                    .map(|v| v.render() == pid.as_str())
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn fetch_table_rows(&self, policy: &TablePolicy) -> Result<Vec<SourceRow>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|r| r.table == policy.source_table)
            .cloned()
            .collect())
    }
}

/// In-memory destination capturing written rows and markers
#[derive(Default)]
pub struct MemoryDestination {
    pub written: Mutex<HashMap<(String, String), TransformedRow>>,
    pub markers: Mutex<HashMap<String, RowMarker>>,
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows_for_table(&self, table: &str) -> Vec<TransformedRow> {
        let mut rows: Vec<TransformedRow> = self
            .written
            .lock()
            .unwrap()
            .iter()
            .filter(|((t, _), _)| t == table)
            .map(|(_, row)| row.clone())
            .collect();
        rows.sort_by(|a, b| a.source_row_id.cmp(&b.source_row_id));
        rows
    }

    pub fn total_rows(&self) -> usize {
        self.written.lock().unwrap().len()
    }
}

#[async_trait]
impl DestinationDatabase for MemoryDestination {
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn ensure_destination_tables(&self, _dictionary: &Dictionary) -> Result<()> {
        Ok(())
    }

    async fn ensure_control_table(&self) -> Result<()> {
        Ok(())
    }

    async fn write_rows(&self, rows: &[TransformedRow]) -> Result<WriteOutcome> {
        let mut written = self.written.lock().unwrap();
        for row in rows {
            written.insert(
                (row.dest_table.clone(), row.source_row_id.clone()),
                row.clone(),
            );
        }
        Ok(WriteOutcome {
            written: rows.len(),
            failures: vec![],
        })
    }
}

#[async_trait]
impl MarkerStore for MemoryDestination {
    async fn load_markers(&self, row_keys: &[String]) -> Result<HashMap<String, RowMarker>> {
        let markers = self.markers.lock().unwrap();
        Ok(row_keys
            .iter()
            .filter_map(|key| markers.get(key).map(|m| (key.clone(), m.clone())))
            .collect())
    }

    async fn save_markers(&self, new_markers: &[RowMarker]) -> Result<()> {
        let mut markers = self.markers.lock().unwrap();
        for marker in new_markers {
            markers.insert(marker.row_key.clone(), marker.clone());
        }
        Ok(())
    }

    async fn count_markers(&self) -> Result<u64> {
        Ok(self.markers.lock().unwrap().len() as u64)
    }

    async fn latest_run(&self) -> Result<Option<(RunId, DateTime<Utc>)>> {
        Ok(self
            .markers
            .lock()
            .unwrap()
            .values()
            .max_by_key(|m| m.transformed_at)
            .map(|m| (m.run_id, m.transformed_at)))
    }
}

/// A minimal valid configuration for pipeline tests
pub fn test_config(mode: &str, primary_key: &str) -> VeilConfig {
    VeilConfig {
        application: ApplicationConfig {
            log_level: "info".to_string(),
            dry_run: false,
        },
        environment: Environment::Development,
        sources: vec![SourceConfig {
            name: "ehr".to_string(),
            connection_string: secret_string("postgresql://unused@localhost/ehr".to_string()),
            schema: "public".to_string(),
            read_only: true,
            max_connections: 2,
            connection_timeout_seconds: 5,
        }],
        destination: DestinationConfig {
            connection_string: secret_string("postgresql://unused@localhost/research".to_string()),
            schema: "public".to_string(),
            control_table: "veil_row_markers".to_string(),
            max_connections: 2,
            connection_timeout_seconds: 5,
        },
        dictionary: DictionaryConfig {
            path: "unused.tsv".to_string(),
            delimiter: "\t".to_string(),
        },
        pipeline: PipelineConfig {
            mode: mode.to_string(),
            parallel_patients: 4,
            shutdown_timeout_secs: 5,
            retry: RetryConfig {
                max_retries: 1,
                initial_delay_ms: 1,
                max_delay_ms: 2,
                backoff_multiplier: 2.0,
            },
        },
        keys: KeysConfig {
            primary_key: secret_string(primary_key.to_string()),
            master_key: secret_string(format!("{primary_key}-master")),
        },
        scrub: ScrubConfig::default(),
        logging: LoggingConfig::default(),
    }
}
