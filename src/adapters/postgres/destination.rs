//! PostgreSQL destination adapter
//!
//! Owns the research-copy schema: creates destination tables from the
//! dictionary, upserts transformed rows keyed by the row-identity
//! digest, and persists incremental-run markers in the control table.
//!
//! Upserting by row key makes the pipeline idempotent: re-running over
//! an unchanged source rewrites byte-identical rows rather than
//! duplicating them.

use crate::adapters::postgres::client::PgClient;
use crate::adapters::traits::{DestinationDatabase, MarkerStore, WriteOutcome};
use crate::dictionary::{Dictionary, SourceDatatype};
use crate::domain::ids::RunId;
use crate::domain::{Result, SqlValue, TransformedRow, VeilError};
use crate::pipeline::marker::RowMarker;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use tokio_postgres::types::ToSql;

/// Synthetic primary-key column added to every destination table
const ROW_KEY_COLUMN: &str = "veil_row_key";

/// One declared destination column
#[derive(Debug, Clone)]
struct DestColumn {
    name: String,
    datatype: SourceDatatype,
    index_requested: bool,
}

/// Destination adapter over a pooled PostgreSQL connection
pub struct PostgresDestination {
    client: PgClient,
    control_table: String,
    /// Destination columns per destination table, from the dictionary
    tables: BTreeMap<String, Vec<DestColumn>>,
}

impl PostgresDestination {
    /// Create a destination adapter for a validated dictionary
    pub fn new(client: PgClient, control_table: impl Into<String>, dictionary: &Dictionary) -> Self {
        let mut tables: BTreeMap<String, Vec<DestColumn>> = BTreeMap::new();
        for entry in dictionary.entries() {
            if !entry.has_destination() || entry.dest_field.is_empty() {
                continue;
            }
            tables
                .entry(entry.dest_table.clone())
                .or_default()
                .push(DestColumn {
                    name: entry.dest_field.clone(),
                    datatype: SourceDatatype::parse(&entry.dest_datatype)
                        .unwrap_or(SourceDatatype::Text),
                    index_requested: entry.index_requested,
                });
        }
        Self {
            client,
            control_table: control_table.into(),
            tables,
        }
    }

    /// SQL column type for a destination datatype
    fn sql_type(datatype: SourceDatatype) -> &'static str {
        match datatype {
            SourceDatatype::Text => "text",
            SourceDatatype::Integer | SourceDatatype::Bigint => "bigint",
            SourceDatatype::Float => "double precision",
            SourceDatatype::Boolean => "boolean",
            SourceDatatype::Date => "date",
            SourceDatatype::Timestamp => "timestamptz",
        }
    }

    /// Bindable parameter for a value going into a column of the given
    /// declared type. NULLs are typed by the column so the server never
    /// sees an ambiguous parameter.
    fn param_for(value: &SqlValue, datatype: SourceDatatype) -> Box<dyn ToSql + Sync + Send> {
        match value {
            SqlValue::Null => match datatype {
                SourceDatatype::Text => Box::new(None::<String>),
                SourceDatatype::Integer | SourceDatatype::Bigint => Box::new(None::<i64>),
                SourceDatatype::Float => Box::new(None::<f64>),
                SourceDatatype::Boolean => Box::new(None::<bool>),
                SourceDatatype::Date => Box::new(None::<chrono::NaiveDate>),
                SourceDatatype::Timestamp => Box::new(None::<DateTime<Utc>>),
            },
            SqlValue::Text(s) => Box::new(s.clone()),
            SqlValue::Integer(i) => Box::new(*i),
            SqlValue::Float(f) => Box::new(*f),
            SqlValue::Bool(b) => Box::new(*b),
            SqlValue::Date(d) => Box::new(*d),
            SqlValue::Timestamp(ts) => Box::new(*ts),
        }
    }

    /// Build the upsert statement for one destination table
    fn build_upsert(&self, table: &str, columns: &[DestColumn]) -> String {
        let mut names = vec![PgClient::quote_ident(ROW_KEY_COLUMN)];
        names.extend(columns.iter().map(|c| PgClient::quote_ident(&c.name)));

        let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("${i}")).collect();

        let updates: Vec<String> = columns
            .iter()
            .map(|c| {
                let quoted = PgClient::quote_ident(&c.name);
                format!("{quoted} = EXCLUDED.{quoted}")
            })
            .collect();

        format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO UPDATE SET {}",
            self.client.qualified(table),
            names.join(", "),
            placeholders.join(", "),
            PgClient::quote_ident(ROW_KEY_COLUMN),
            updates.join(", ")
        )
    }

    /// Build the CREATE TABLE statement for one destination table
    fn build_create_table(&self, table: &str, columns: &[DestColumn]) -> String {
        let mut defs = vec![format!(
            "{} text PRIMARY KEY",
            PgClient::quote_ident(ROW_KEY_COLUMN)
        )];
        defs.extend(columns.iter().map(|c| {
            format!(
                "{} {}",
                PgClient::quote_ident(&c.name),
                Self::sql_type(c.datatype)
            )
        }));
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.client.qualified(table),
            defs.join(", ")
        )
    }
}

#[async_trait]
impl DestinationDatabase for PostgresDestination {
    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn ensure_destination_tables(&self, _dictionary: &Dictionary) -> Result<()> {
        let client = self.client.get().await?;

        for (table, columns) in &self.tables {
            let ddl = self.build_create_table(table, columns);
            client
                .batch_execute(&ddl)
                .await
                .map_err(|e| VeilError::Database(format!("Failed to create {table}: {e}")))?;

            for column in columns.iter().filter(|c| c.index_requested) {
                let index = format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                    PgClient::quote_ident(&format!("idx_{}_{}", table, column.name)),
                    self.client.qualified(table),
                    PgClient::quote_ident(&column.name)
                );
                client.batch_execute(&index).await.map_err(|e| {
                    VeilError::Database(format!(
                        "Failed to create index on {table}.{}: {e}",
                        column.name
                    ))
                })?;
            }
        }

        tracing::info!(tables = self.tables.len(), "Destination tables ensured");
        Ok(())
    }

    async fn ensure_control_table(&self) -> Result<()> {
        let client = self.client.get().await?;
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             row_key text PRIMARY KEY, \
             content_hash text NOT NULL, \
             run_id text NOT NULL, \
             transformed_at timestamptz NOT NULL)",
            self.client.qualified(&self.control_table)
        );
        client
            .batch_execute(&ddl)
            .await
            .map_err(|e| VeilError::Database(format!("Failed to create control table: {e}")))?;
        Ok(())
    }

    async fn write_rows(&self, rows: &[TransformedRow]) -> Result<WriteOutcome> {
        if rows.is_empty() {
            return Ok(WriteOutcome::default());
        }

        let mut client = self.client.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| VeilError::Database(format!("Failed to begin transaction: {e}")))?;

        let mut outcome = WriteOutcome::default();

        for row in rows {
            let columns = self.tables.get(&row.dest_table).ok_or_else(|| {
                VeilError::Database(format!(
                    "Destination table '{}' is not declared by the dictionary",
                    row.dest_table
                ))
            })?;

            let sql = self.build_upsert(&row.dest_table, columns);

            let mut params: Vec<Box<dyn ToSql + Sync + Send>> =
                vec![Box::new(row.source_row_id.clone())];
            for column in columns {
                let value = row.get(&column.name).unwrap_or(&SqlValue::Null);
                params.push(Self::param_for(value, column.datatype));
            }
            let mut param_refs: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(params.len());
            for param in &params {
                param_refs.push(param.as_ref());
            }

            tx.execute(&sql, &param_refs)
                .await
                .map_err(|e| VeilError::Database(format!("Failed to write row: {e}")))?;
            outcome.written += 1;
        }

        tx.commit()
            .await
            .map_err(|e| VeilError::Database(format!("Failed to commit batch: {e}")))?;

        Ok(outcome)
    }
}

#[async_trait]
impl MarkerStore for PostgresDestination {
    async fn load_markers(&self, row_keys: &[String]) -> Result<HashMap<String, RowMarker>> {
        if row_keys.is_empty() {
            return Ok(HashMap::new());
        }

        let client = self.client.get().await?;
        let keys: Vec<String> = row_keys.to_vec();
        let sql = format!(
            "SELECT row_key, content_hash, run_id, transformed_at FROM {} \
             WHERE row_key = ANY($1)",
            self.client.qualified(&self.control_table)
        );
        let rows = client
            .query(&sql, &[&keys])
            .await
            .map_err(|e| VeilError::State(format!("Failed to load markers: {e}")))?;

        let mut markers = HashMap::with_capacity(rows.len());
        for row in rows {
            let run_id_text: String = row.get(2);
            let run_id = RunId::from_str(&run_id_text)
                .map_err(|e| VeilError::State(format!("Corrupt marker run_id: {e}")))?;
            let marker = RowMarker {
                row_key: row.get(0),
                content_hash: row.get(1),
                run_id,
                transformed_at: row.get(3),
            };
            markers.insert(marker.row_key.clone(), marker);
        }
        Ok(markers)
    }

    async fn save_markers(&self, markers: &[RowMarker]) -> Result<()> {
        if markers.is_empty() {
            return Ok(());
        }

        let mut client = self.client.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| VeilError::State(format!("Failed to begin transaction: {e}")))?;

        let sql = format!(
            "INSERT INTO {} (row_key, content_hash, run_id, transformed_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (row_key) DO UPDATE SET \
             content_hash = EXCLUDED.content_hash, \
             run_id = EXCLUDED.run_id, \
             transformed_at = EXCLUDED.transformed_at",
            self.client.qualified(&self.control_table)
        );

        for marker in markers {
            tx.execute(
                &sql,
                &[
                    &marker.row_key,
                    &marker.content_hash,
                    &marker.run_id.to_string(),
                    &marker.transformed_at,
                ],
            )
            .await
            .map_err(|e| VeilError::State(format!("Failed to save marker: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| VeilError::State(format!("Failed to commit markers: {e}")))?;
        Ok(())
    }

    async fn count_markers(&self) -> Result<u64> {
        let client = self.client.get().await?;
        let sql = format!(
            "SELECT count(*) FROM {}",
            self.client.qualified(&self.control_table)
        );
        let row = client
            .query_one(&sql, &[])
            .await
            .map_err(|e| VeilError::State(format!("Failed to count markers: {e}")))?;
        Ok(row.get::<_, i64>(0) as u64)
    }

    async fn latest_run(&self) -> Result<Option<(RunId, DateTime<Utc>)>> {
        let client = self.client.get().await?;
        let sql = format!(
            "SELECT run_id, max(transformed_at) AS last_seen FROM {} \
             GROUP BY run_id ORDER BY last_seen DESC LIMIT 1",
            self.client.qualified(&self.control_table)
        );
        let rows = client
            .query(&sql, &[])
            .await
            .map_err(|e| VeilError::State(format!("Failed to query latest run: {e}")))?;

        match rows.first() {
            Some(row) => {
                let run_id_text: String = row.get(0);
                let run_id = RunId::from_str(&run_id_text)
                    .map_err(|e| VeilError::State(format!("Corrupt marker run_id: {e}")))?;
                Ok(Some((run_id, row.get(1))))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::loader::EXPECTED_HEADER;

    fn dictionary() -> Dictionary {
        let rows = [
            "ehr\tnotes\tpatient_id\tinteger\tPRIMARY_PID\tnotes\trid\ttext\tfalse\t\ttrue\t",
            "ehr\tnotes\tclinical_note\ttext\tINCLUDE_SCRUBBED\tnotes\tclinical_note\ttext\tfalse\t\tfalse\t",
            "ehr\tnotes\tadmitted\ttimestamp\tINCLUDE_VERBATIM\tnotes\tadmitted\ttimestamp\tfalse\t\tfalse\t",
        ];
        let content = format!("{}\n{}\n", EXPECTED_HEADER.join("\t"), rows.join("\n"));
        Dictionary::from_str(&content, '\t').unwrap()
    }

    fn destination() -> PostgresDestination {
        let secret = crate::config::secret_string("postgresql://u@localhost/research".to_string());
        let client = PgClient::new(&secret, "public", 2, 5).unwrap();
        PostgresDestination::new(client, "veil_row_markers", &dictionary())
    }

    #[tokio::test]
    async fn test_tables_derived_from_dictionary() {
        let dest = destination();
        let columns = dest.tables.get("notes").unwrap();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["rid", "clinical_note", "admitted"]);
    }

    #[tokio::test]
    async fn test_create_table_ddl() {
        let dest = destination();
        let ddl = dest.build_create_table("notes", dest.tables.get("notes").unwrap());
        assert!(ddl.contains("\"veil_row_key\" text PRIMARY KEY"));
        assert!(ddl.contains("\"rid\" text"));
        assert!(ddl.contains("\"admitted\" timestamptz"));
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS"));
    }

    #[tokio::test]
    async fn test_upsert_statement_shape() {
        let dest = destination();
        let sql = dest.build_upsert("notes", dest.tables.get("notes").unwrap());
        assert!(sql.contains("ON CONFLICT (\"veil_row_key\") DO UPDATE SET"));
        assert!(sql.contains("\"clinical_note\" = EXCLUDED.\"clinical_note\""));
        assert!(sql.contains("$1") && sql.contains("$4"));
    }

    #[test]
    fn test_sql_type_mapping() {
        assert_eq!(PostgresDestination::sql_type(SourceDatatype::Text), "text");
        assert_eq!(
            PostgresDestination::sql_type(SourceDatatype::Integer),
            "bigint"
        );
        assert_eq!(
            PostgresDestination::sql_type(SourceDatatype::Float),
            "double precision"
        );
    }
}
