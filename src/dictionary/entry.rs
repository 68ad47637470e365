//! Data dictionary entry model
//!
//! One entry per source column, declaring whether and how that column is
//! carried into the destination. The `decision` is a closed enum,
//! exhaustively matched by the transform engine, so a new decision can
//! never silently fall through to a no-op.

use crate::domain::SqlValue;
use crate::scrub::IdentifierKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-column transformation decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// Field is dropped from the destination entirely
    Omit,
    /// Field is copied unchanged
    IncludeVerbatim,
    /// Free text, scrubbed through the owning patient's scrubber
    IncludeScrubbed,
    /// Local patient identifier, replaced with its RID pseudonym
    PrimaryPid,
    /// Master (cross-system) patient identifier, replaced with its MRID
    MasterPid,
    /// Destination column receives the source row's content hash,
    /// used only for incremental change detection
    AddSourceHash,
}

impl Decision {
    /// Parse a decision keyword as written in the dictionary file
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "OMIT" => Some(Self::Omit),
            "INCLUDE_VERBATIM" => Some(Self::IncludeVerbatim),
            "INCLUDE_SCRUBBED" => Some(Self::IncludeScrubbed),
            "PRIMARY_PID" => Some(Self::PrimaryPid),
            "MASTER_PID" => Some(Self::MasterPid),
            "ADD_SOURCE_HASH" => Some(Self::AddSourceHash),
            _ => None,
        }
    }

    /// The keyword used in dictionary files
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Omit => "OMIT",
            Self::IncludeVerbatim => "INCLUDE_VERBATIM",
            Self::IncludeScrubbed => "INCLUDE_SCRUBBED",
            Self::PrimaryPid => "PRIMARY_PID",
            Self::MasterPid => "MASTER_PID",
            Self::AddSourceHash => "ADD_SOURCE_HASH",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// Declared source column datatype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceDatatype {
    /// Character data of any length
    Text,
    /// smallint/int
    Integer,
    /// bigint
    Bigint,
    /// real/double precision/numeric
    Float,
    /// boolean
    Boolean,
    /// date
    Date,
    /// timestamp / timestamptz
    Timestamp,
}

impl SourceDatatype {
    /// Parse a datatype keyword as written in the dictionary file
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" | "varchar" | "char" => Some(Self::Text),
            "integer" | "int" | "smallint" => Some(Self::Integer),
            "bigint" => Some(Self::Bigint),
            "float" | "real" | "double" | "numeric" | "decimal" => Some(Self::Float),
            "boolean" | "bool" => Some(Self::Boolean),
            "date" => Some(Self::Date),
            "timestamp" | "timestamptz" | "datetime" => Some(Self::Timestamp),
            _ => None,
        }
    }

    /// Whether this datatype holds character data
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text)
    }

    /// The keyword used in dictionary files
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Bigint => "bigint",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Timestamp => "timestamp",
        }
    }

    /// Whether a runtime value conforms to this declared datatype.
    ///
    /// NULL conforms to every datatype; required-field checks are the
    /// transform engine's concern, not the datatype's.
    pub fn accepts(&self, value: &SqlValue) -> bool {
        match (self, value) {
            (_, SqlValue::Null) => true,
            (Self::Text, SqlValue::Text(_)) => true,
            (Self::Integer | Self::Bigint, SqlValue::Integer(_)) => true,
            (Self::Float, SqlValue::Float(_) | SqlValue::Integer(_)) => true,
            (Self::Boolean, SqlValue::Bool(_)) => true,
            (Self::Date, SqlValue::Date(_)) => true,
            (Self::Timestamp, SqlValue::Timestamp(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SourceDatatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// One data dictionary entry, keyed by (source_db, source_table, source_field)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataDictionaryEntry {
    /// Source database name (as configured)
    pub source_db: String,

    /// Source table name
    pub source_table: String,

    /// Source column name
    pub source_field: String,

    /// Declared datatype of the source column
    pub source_datatype: SourceDatatype,

    /// Transformation decision for this column
    pub decision: Decision,

    /// Destination table name
    pub dest_table: String,

    /// Destination column name
    pub dest_field: String,

    /// Destination datatype, as written in the dictionary
    pub dest_datatype: String,

    /// Whether this column's values feed the owning patient's scrubber
    pub is_patient_identifier: bool,

    /// Kind of identifier, required when `is_patient_identifier` is set
    pub identifier_kind: Option<IdentifierKind>,

    /// Whether an index was requested on the destination column
    pub index_requested: bool,

    /// Free-text comment from the dictionary author
    pub comment: String,
}

impl DataDictionaryEntry {
    /// The unique entry key, for diagnostics
    pub fn key(&self) -> String {
        format!(
            "{}.{}.{}",
            self.source_db, self.source_table, self.source_field
        )
    }

    /// Whether this entry produces a destination column
    pub fn has_destination(&self) -> bool {
        self.decision != Decision::Omit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("OMIT", Decision::Omit)]
    #[test_case("include_verbatim", Decision::IncludeVerbatim)]
    #[test_case(" Include_Scrubbed ", Decision::IncludeScrubbed)]
    #[test_case("PRIMARY_PID", Decision::PrimaryPid)]
    #[test_case("MASTER_PID", Decision::MasterPid)]
    #[test_case("ADD_SOURCE_HASH", Decision::AddSourceHash)]
    fn test_decision_parse(input: &str, expected: Decision) {
        assert_eq!(Decision::parse(input), Some(expected));
    }

    #[test]
    fn test_decision_parse_unknown() {
        assert_eq!(Decision::parse("KEEP"), None);
        assert_eq!(Decision::parse(""), None);
    }

    #[test_case("text", SourceDatatype::Text)]
    #[test_case("VARCHAR", SourceDatatype::Text)]
    #[test_case("int", SourceDatatype::Integer)]
    #[test_case("bigint", SourceDatatype::Bigint)]
    #[test_case("numeric", SourceDatatype::Float)]
    #[test_case("bool", SourceDatatype::Boolean)]
    #[test_case("date", SourceDatatype::Date)]
    #[test_case("timestamptz", SourceDatatype::Timestamp)]
    fn test_datatype_parse(input: &str, expected: SourceDatatype) {
        assert_eq!(SourceDatatype::parse(input), Some(expected));
    }

    #[test]
    fn test_datatype_accepts() {
        use crate::domain::SqlValue;

        assert!(SourceDatatype::Text.accepts(&SqlValue::Text("x".into())));
        assert!(!SourceDatatype::Text.accepts(&SqlValue::Integer(1)));
        assert!(SourceDatatype::Bigint.accepts(&SqlValue::Integer(1)));
        assert!(SourceDatatype::Float.accepts(&SqlValue::Integer(1)));
        // NULL conforms to every declared type
        assert!(SourceDatatype::Date.accepts(&SqlValue::Null));
    }

    #[test]
    fn test_keyword_roundtrip() {
        for decision in [
            Decision::Omit,
            Decision::IncludeVerbatim,
            Decision::IncludeScrubbed,
            Decision::PrimaryPid,
            Decision::MasterPid,
            Decision::AddSourceHash,
        ] {
            assert_eq!(Decision::parse(decision.keyword()), Some(decision));
        }
    }
}
