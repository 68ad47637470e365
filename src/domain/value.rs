//! Relational value and row models
//!
//! Source rows are modelled as ordered column maps of [`SqlValue`], a
//! closed enum over the datatypes the dictionary can declare. Columns are
//! kept in a `BTreeMap` so that iteration order, and therefore row
//! content hashes, are deterministic across runs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single relational value read from a source column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SqlValue {
    /// SQL NULL
    Null,
    /// Character data of any length
    Text(String),
    /// Integer value (covers smallint/int/bigint)
    Integer(i64),
    /// Floating-point value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// Calendar date without time of day
    Date(NaiveDate),
    /// Timestamp with UTC offset
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    /// Whether this value is SQL NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the inner text, if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Name of the value's runtime type, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Text(_) => "text",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Bool(_) => "boolean",
            Self::Date(_) => "date",
            Self::Timestamp(_) => "timestamp",
        }
    }

    /// Canonical text rendering, used for identifier gathering and row
    /// content hashing. NULL renders as the empty string.
    pub fn render(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Text(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::Timestamp(ts) => ts.to_rfc3339(),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// One row read from a source table
///
/// `row_id` is the source primary key rendered as text, supplied by the
/// source adapter; it is the stable identity that incremental markers
/// are keyed on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRow {
    /// Source database name (as configured)
    pub source_db: String,

    /// Source table name
    pub table: String,

    /// Stable per-row identity from the source primary key
    pub row_id: String,

    /// Column values, ordered by column name
    pub columns: BTreeMap<String, SqlValue>,
}

impl SourceRow {
    /// Create a new source row
    pub fn new(
        source_db: impl Into<String>,
        table: impl Into<String>,
        row_id: impl Into<String>,
    ) -> Self {
        Self {
            source_db: source_db.into(),
            table: table.into(),
            row_id: row_id.into(),
            columns: BTreeMap::new(),
        }
    }

    /// Insert a column value, builder-style
    pub fn with_column(mut self, name: impl Into<String>, value: SqlValue) -> Self {
        self.columns.insert(name.into(), value);
        self
    }

    /// Look up a column value by name
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns.get(column)
    }
}

/// One row ready to be written to the destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformedRow {
    /// Destination table name
    pub dest_table: String,

    /// Identity of the source row this was derived from
    pub source_row_id: String,

    /// Transformed column values, ordered by column name
    pub columns: BTreeMap<String, SqlValue>,
}

impl TransformedRow {
    /// Create an empty transformed row for a destination table
    pub fn new(dest_table: impl Into<String>, source_row_id: impl Into<String>) -> Self {
        Self {
            dest_table: dest_table.into(),
            source_row_id: source_row_id.into(),
            columns: BTreeMap::new(),
        }
    }

    /// Insert a destination column value
    pub fn insert(&mut self, name: impl Into<String>, value: SqlValue) {
        self.columns.insert(name.into(), value);
    }

    /// Look up a destination column value by name
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns.get(column)
    }
}
