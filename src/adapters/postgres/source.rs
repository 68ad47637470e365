//! PostgreSQL source adapter
//!
//! Reads dictionary-declared columns from one source database. The
//! select list is always built from the dictionary with explicit casts,
//! so values arrive typed exactly as declared, and columns the
//! dictionary does not cover are never read at all.

use crate::adapters::postgres::client::PgClient;
use crate::adapters::traits::SourceDatabase;
use crate::dictionary::{Decision, SourceDatatype, SourceSchema, TablePolicy};
use crate::domain::{Pid, Result, SourceRow, SqlValue, VeilError};
use crate::transform::content_hash::row_content_hash;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::Mutex;
use tokio_postgres::Row;

/// Source adapter over a pooled PostgreSQL connection
pub struct PostgresSource {
    name: String,
    client: PgClient,
    /// Primary-key columns per table, introspected once and cached
    pk_cache: Mutex<HashMap<String, Vec<String>>>,
}

impl PostgresSource {
    /// Create a source adapter
    pub fn new(name: impl Into<String>, client: PgClient) -> Self {
        Self {
            name: name.into(),
            client,
            pk_cache: Mutex::new(HashMap::new()),
        }
    }

    /// SQL cast suffix for a declared datatype
    fn cast_for(datatype: SourceDatatype) -> &'static str {
        match datatype {
            SourceDatatype::Text => "::text",
            SourceDatatype::Integer | SourceDatatype::Bigint => "::int8",
            SourceDatatype::Float => "::float8",
            SourceDatatype::Boolean => "::boolean",
            SourceDatatype::Date => "::date",
            SourceDatatype::Timestamp => "::timestamptz",
        }
    }

    /// Primary-key columns of a table, in ordinal order
    async fn pk_columns(&self, table: &str) -> Result<Vec<String>> {
        {
            let cache = self.pk_cache.lock().await;
            if let Some(cols) = cache.get(table) {
                return Ok(cols.clone());
            }
        }

        let client = self.client.get().await?;
        let rows = client
            .query(
                "SELECT kcu.column_name \
                 FROM information_schema.table_constraints tc \
                 JOIN information_schema.key_column_usage kcu \
                   ON tc.constraint_name = kcu.constraint_name \
                  AND tc.table_schema = kcu.table_schema \
                 WHERE tc.table_schema = $1 \
                   AND tc.table_name = $2 \
                   AND tc.constraint_type = 'PRIMARY KEY' \
                 ORDER BY kcu.ordinal_position",
                &[&self.client.schema(), &table],
            )
            .await
            .map_err(|e| VeilError::Database(format!("Failed to introspect primary key: {e}")))?;

        let cols: Vec<String> = rows.iter().map(|r| r.get::<_, String>(0)).collect();
        if cols.is_empty() {
            tracing::warn!(
                source = %self.name,
                table,
                "Table has no primary key; row identity falls back to content hashing \
                 and updated rows will be re-written as new"
            );
        }

        self.pk_cache
            .lock()
            .await
            .insert(table.to_string(), cols.clone());
        Ok(cols)
    }

    /// Dictionary entries that read an actual source column
    fn readable_entries(policy: &TablePolicy) -> Vec<&crate::dictionary::DataDictionaryEntry> {
        policy
            .entries
            .iter()
            .filter(|e| e.decision != Decision::AddSourceHash)
            .collect()
    }

    /// Build the select statement for a table policy
    fn build_select(&self, policy: &TablePolicy, pk_cols: &[String], filtered: bool) -> String {
        let entries = Self::readable_entries(policy);

        let mut items: Vec<String> = entries
            .iter()
            .map(|e| {
                format!(
                    "{}{}",
                    PgClient::quote_ident(&e.source_field),
                    Self::cast_for(e.source_datatype)
                )
            })
            .collect();

        for (i, pk) in pk_cols.iter().enumerate() {
            items.push(format!(
                "{}::text AS \"__pk_{i}\"",
                PgClient::quote_ident(pk)
            ));
        }

        let mut sql = format!(
            "SELECT {} FROM {}",
            items.join(", "),
            self.client.qualified(&policy.source_table)
        );

        if filtered {
            let pid_col = policy
                .primary_pid_column
                .as_deref()
                .expect("filtered fetch requires a patient table");
            sql.push_str(&format!(
                " WHERE {}::text = $1",
                PgClient::quote_ident(pid_col)
            ));
        }

        sql
    }

    /// Convert one result row into a [`SourceRow`]
    fn read_row(&self, policy: &TablePolicy, pk_cols: &[String], row: &Row) -> Result<SourceRow> {
        let entries = Self::readable_entries(policy);
        let mut out = SourceRow::new(self.name.clone(), policy.source_table.clone(), String::new());

        for (i, entry) in entries.iter().enumerate() {
            let value = Self::read_value(row, i, entry.source_datatype).map_err(|e| {
                VeilError::Database(format!(
                    "Failed to read {}.{}: {e}",
                    entry.source_table, entry.source_field
                ))
            })?;
            out.columns.insert(entry.source_field.clone(), value);
        }

        let base = entries.len();
        let mut pk_parts = Vec::with_capacity(pk_cols.len());
        for i in 0..pk_cols.len() {
            let part: Option<String> = row
                .try_get(base + i)
                .map_err(|e| VeilError::Database(format!("Failed to read primary key: {e}")))?;
            pk_parts.push(part.unwrap_or_default());
        }

        out.row_id = if pk_parts.is_empty() {
            // No primary key: identity degrades to content addressing
            row_content_hash(&out)
        } else {
            pk_parts.join(":")
        };

        Ok(out)
    }

    fn read_value(
        row: &Row,
        idx: usize,
        datatype: SourceDatatype,
    ) -> std::result::Result<SqlValue, tokio_postgres::Error> {
        let value = match datatype {
            SourceDatatype::Text => row
                .try_get::<_, Option<String>>(idx)?
                .map_or(SqlValue::Null, SqlValue::Text),
            SourceDatatype::Integer | SourceDatatype::Bigint => row
                .try_get::<_, Option<i64>>(idx)?
                .map_or(SqlValue::Null, SqlValue::Integer),
            SourceDatatype::Float => row
                .try_get::<_, Option<f64>>(idx)?
                .map_or(SqlValue::Null, SqlValue::Float),
            SourceDatatype::Boolean => row
                .try_get::<_, Option<bool>>(idx)?
                .map_or(SqlValue::Null, SqlValue::Bool),
            SourceDatatype::Date => row
                .try_get::<_, Option<chrono::NaiveDate>>(idx)?
                .map_or(SqlValue::Null, SqlValue::Date),
            SourceDatatype::Timestamp => row
                .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)?
                .map_or(SqlValue::Null, SqlValue::Timestamp),
        };
        Ok(value)
    }
}

#[async_trait]
impl SourceDatabase for PostgresSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn introspect_schema(&self) -> Result<SourceSchema> {
        let client = self.client.get().await?;
        let rows = client
            .query(
                "SELECT table_name, column_name \
                 FROM information_schema.columns \
                 WHERE table_schema = $1",
                &[&self.client.schema()],
            )
            .await
            .map_err(|e| VeilError::Database(format!("Schema introspection failed: {e}")))?;

        let mut schema = SourceSchema::new();
        for row in rows {
            let table: String = row.get(0);
            let column: String = row.get(1);
            schema.add_column(self.name.clone(), table, column);
        }
        Ok(schema)
    }

    async fn list_patient_ids(&self, policies: &[TablePolicy]) -> Result<Vec<Pid>> {
        let mut distinct: BTreeSet<String> = BTreeSet::new();

        for policy in policies.iter().filter(|p| !p.is_system()) {
            let pid_col = policy
                .primary_pid_column
                .as_deref()
                .expect("non-system tables have a PRIMARY_PID column");
            let sql = format!(
                "SELECT DISTINCT {col}::text FROM {table} WHERE {col} IS NOT NULL",
                col = PgClient::quote_ident(pid_col),
                table = self.client.qualified(&policy.source_table),
            );

            let client = self.client.get().await?;
            let rows = client
                .query(&sql, &[])
                .await
                .map_err(|e| VeilError::Database(format!("Failed to list patient ids: {e}")))?;

            for row in rows {
                distinct.insert(row.get::<_, String>(0));
            }
        }

        Ok(distinct
            .into_iter()
            .filter_map(|id| Pid::new(id).ok())
            .collect())
    }

    async fn fetch_patient_rows(&self, policy: &TablePolicy, pid: &Pid) -> Result<Vec<SourceRow>> {
        let pk_cols = self.pk_columns(&policy.source_table).await?;
        let sql = self.build_select(policy, &pk_cols, true);

        let client = self.client.get().await?;
        let rows = client
            .query(&sql, &[&pid.as_str()])
            .await
            .map_err(|e| VeilError::Database(format!("Failed to fetch patient rows: {e}")))?;

        rows.iter()
            .map(|r| self.read_row(policy, &pk_cols, r))
            .collect()
    }

    async fn fetch_table_rows(&self, policy: &TablePolicy) -> Result<Vec<SourceRow>> {
        let pk_cols = self.pk_columns(&policy.source_table).await?;
        let sql = self.build_select(policy, &pk_cols, false);

        let client = self.client.get().await?;
        let rows = client
            .query(&sql, &[])
            .await
            .map_err(|e| VeilError::Database(format!("Failed to fetch table rows: {e}")))?;

        rows.iter()
            .map(|r| self.read_row(policy, &pk_cols, r))
            .collect()
    }
}
