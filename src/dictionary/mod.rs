//! Data dictionary: the declarative per-column transformation policy
//!
//! The dictionary is loaded once at startup, validated in full, and
//! shared read-only across all pipeline workers. Loading fails on any
//! violation: a missing scrub directive on a text column is an
//! information-leak risk, not merely a data-quality bug.
//!
//! # Usage
//!
//! ```rust,no_run
//! use veil::dictionary::Dictionary;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let dd = Dictionary::load("dictionary.tsv", '\t')?;
//! for policy in dd.table_policies() {
//!     println!("{}.{}: system={}", policy.source_db, policy.source_table, policy.is_system());
//! }
//! # Ok(())
//! # }
//! ```

pub mod entry;
pub mod loader;
pub mod validate;

pub use entry::{DataDictionaryEntry, Decision, SourceDatatype};
pub use validate::SourceSchema;

use crate::domain::errors::DictionaryError;
use std::collections::BTreeMap;
use std::path::Path;

/// The loaded, validated data dictionary
#[derive(Debug, Clone)]
pub struct Dictionary {
    entries: Vec<DataDictionaryEntry>,
    tables: Vec<TablePolicy>,
}

/// All dictionary entries for one source table, with derived facts the
/// pipeline needs per table
#[derive(Debug, Clone)]
pub struct TablePolicy {
    /// Source database name
    pub source_db: String,

    /// Source table name
    pub source_table: String,

    /// Entries for this table, in dictionary order
    pub entries: Vec<DataDictionaryEntry>,

    /// The PRIMARY_PID column, if this is a patient table
    pub primary_pid_column: Option<String>,
}

impl TablePolicy {
    /// A table with no PRIMARY_PID column is a "system" table, processed
    /// without per-patient grouping and without a scrubber.
    pub fn is_system(&self) -> bool {
        self.primary_pid_column.is_none()
    }

    /// Entries whose values feed the owning patient's scrubber
    pub fn identifier_entries(&self) -> impl Iterator<Item = &DataDictionaryEntry> {
        self.entries.iter().filter(|e| e.is_patient_identifier)
    }

    /// Whether any column in this table is flagged as a patient identifier
    pub fn has_identifier_columns(&self) -> bool {
        self.entries.iter().any(|e| e.is_patient_identifier)
    }
}

impl Dictionary {
    /// Load and validate a dictionary from a delimited file.
    ///
    /// # Errors
    ///
    /// Returns a [`DictionaryError`] if the file cannot be read, parsed,
    /// or violates any dictionary invariant. All such errors are fatal;
    /// the run must not start.
    pub fn load(path: impl AsRef<Path>, delimiter: char) -> Result<Self, DictionaryError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DictionaryError::FileUnreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;
        Self::from_str(&content, delimiter)
    }

    /// Parse and validate dictionary content.
    pub fn from_str(content: &str, delimiter: char) -> Result<Self, DictionaryError> {
        let entries = loader::parse_entries(content, delimiter)?;
        validate::validate_entries(&entries)?;
        let tables = build_table_policies(&entries);
        Ok(Self { entries, tables })
    }

    /// All entries, in file order
    pub fn entries(&self) -> &[DataDictionaryEntry] {
        &self.entries
    }

    /// Per-table policies, ordered by (source_db, source_table)
    pub fn table_policies(&self) -> &[TablePolicy] {
        &self.tables
    }

    /// The policy for one source table, if the dictionary covers it
    pub fn table_policy(&self, source_db: &str, source_table: &str) -> Option<&TablePolicy> {
        self.tables
            .iter()
            .find(|t| t.source_db == source_db && t.source_table == source_table)
    }

    /// Validate every entry against the introspected source catalog.
    ///
    /// # Errors
    ///
    /// Returns a fatal [`DictionaryError`] if any entry names a column
    /// absent from the schema.
    pub fn validate_against_schema(&self, schema: &SourceSchema) -> Result<(), DictionaryError> {
        validate::validate_against_schema(&self.entries, schema)
    }
}

fn build_table_policies(entries: &[DataDictionaryEntry]) -> Vec<TablePolicy> {
    let mut grouped: BTreeMap<(String, String), Vec<DataDictionaryEntry>> = BTreeMap::new();
    for entry in entries {
        grouped
            .entry((entry.source_db.clone(), entry.source_table.clone()))
            .or_default()
            .push(entry.clone());
    }

    grouped
        .into_iter()
        .map(|((source_db, source_table), entries)| {
            let primary_pid_column = entries
                .iter()
                .find(|e| e.decision == Decision::PrimaryPid)
                .map(|e| e.source_field.clone());
            TablePolicy {
                source_db,
                source_table,
                entries,
                primary_pid_column,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::loader::EXPECTED_HEADER;

    fn dictionary_content() -> String {
        let rows = [
            "ehr\tpatients\tpatient_id\tinteger\tPRIMARY_PID\tpatients\trid\ttext\tfalse\t\ttrue\t",
            "ehr\tpatients\tforename\ttext\tOMIT\t\t\t\ttrue\tname\tfalse\t",
            "ehr\tpatients\tdob\tdate\tOMIT\t\t\t\ttrue\tdate\tfalse\t",
            "ehr\tnotes\tnote_id\tinteger\tINCLUDE_VERBATIM\tnotes\tnote_id\tinteger\tfalse\t\tfalse\t",
            "ehr\tnotes\tpatient_id\tinteger\tPRIMARY_PID\tnotes\trid\ttext\tfalse\t\ttrue\t",
            "ehr\tnotes\tclinical_note\ttext\tINCLUDE_SCRUBBED\tnotes\tclinical_note\ttext\tfalse\t\tfalse\t",
            "ehr\tlookups\tcode\ttext\tINCLUDE_VERBATIM\tlookups\tcode\ttext\tfalse\t\tfalse\t",
        ];
        format!("{}\n{}\n", EXPECTED_HEADER.join("\t"), rows.join("\n"))
    }

    #[test]
    fn test_load_from_str() {
        let dd = Dictionary::from_str(&dictionary_content(), '\t').unwrap();
        assert_eq!(dd.entries().len(), 7);
        assert_eq!(dd.table_policies().len(), 3);
    }

    #[test]
    fn test_table_policy_classification() {
        let dd = Dictionary::from_str(&dictionary_content(), '\t').unwrap();

        let patients = dd.table_policy("ehr", "patients").unwrap();
        assert!(!patients.is_system());
        assert_eq!(patients.primary_pid_column.as_deref(), Some("patient_id"));
        assert!(patients.has_identifier_columns());
        assert_eq!(patients.identifier_entries().count(), 2);

        let lookups = dd.table_policy("ehr", "lookups").unwrap();
        assert!(lookups.is_system());
        assert!(!lookups.has_identifier_columns());
    }

    #[test]
    fn test_load_rejects_invalid_dictionary() {
        // Scrubbed column in a table without PRIMARY_PID
        let content = format!(
            "{}\nehr\tlookups\tdescription\ttext\tINCLUDE_SCRUBBED\tlookups\tdescription\ttext\tfalse\t\tfalse\t\n",
            EXPECTED_HEADER.join("\t")
        );
        assert!(Dictionary::from_str(&content, '\t').is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Dictionary::load("/nonexistent/dd.tsv", '\t').unwrap_err();
        assert!(matches!(err, DictionaryError::FileUnreadable { .. }));
    }
}
