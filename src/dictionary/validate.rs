//! Dictionary invariant validation
//!
//! Two validation layers: pure cross-entry checks that run at load time,
//! and schema checks that run once the source adapters have introspected
//! their catalogs. Any violation is fatal before the pipeline starts.

use crate::dictionary::entry::{DataDictionaryEntry, Decision};
use crate::domain::errors::DictionaryError;
use std::collections::{HashMap, HashSet};

/// Introspected source schema: the set of columns per (db, table)
///
/// Populated by the source adapters at startup and handed to
/// [`validate_against_schema`].
#[derive(Debug, Default, Clone)]
pub struct SourceSchema {
    columns: HashMap<(String, String), HashSet<String>>,
}

impl SourceSchema {
    /// Create an empty schema map
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a column as present in the source catalog
    pub fn add_column(
        &mut self,
        db: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
    ) {
        self.columns
            .entry((db.into(), table.into()))
            .or_default()
            .insert(column.into());
    }

    /// Whether the catalog contains the given column
    pub fn contains(&self, db: &str, table: &str, column: &str) -> bool {
        self.columns
            .get(&(db.to_string(), table.to_string()))
            .is_some_and(|cols| cols.contains(column))
    }
}

/// Cross-entry invariant checks, independent of the live schema.
///
/// Violations checked here:
/// - duplicate (source_db, source_table, source_field) keys
/// - more than one PRIMARY_PID or MASTER_PID per table
/// - duplicate destination fields within a destination table
/// - INCLUDE_SCRUBBED on a non-text column
/// - INCLUDE_SCRUBBED in a table with no PRIMARY_PID column
/// - identifier columns with no declared kind
pub fn validate_entries(entries: &[DataDictionaryEntry]) -> Result<(), DictionaryError> {
    let mut seen_keys: HashSet<(String, String, String)> = HashSet::new();
    let mut primary_pid_tables: HashSet<(String, String)> = HashSet::new();
    let mut master_pid_tables: HashSet<(String, String)> = HashSet::new();
    let mut dest_fields: HashSet<(String, String)> = HashSet::new();

    for entry in entries {
        let key = (
            entry.source_db.clone(),
            entry.source_table.clone(),
            entry.source_field.clone(),
        );
        if !seen_keys.insert(key) {
            return Err(DictionaryError::DuplicateEntry {
                db: entry.source_db.clone(),
                table: entry.source_table.clone(),
                field: entry.source_field.clone(),
            });
        }

        let table_key = (entry.source_db.clone(), entry.source_table.clone());
        match entry.decision {
            Decision::PrimaryPid => {
                if !primary_pid_tables.insert(table_key) {
                    return Err(DictionaryError::MultiplePrimaryPid {
                        db: entry.source_db.clone(),
                        table: entry.source_table.clone(),
                    });
                }
            }
            Decision::MasterPid => {
                if !master_pid_tables.insert(table_key) {
                    return Err(DictionaryError::MultipleMasterPid {
                        db: entry.source_db.clone(),
                        table: entry.source_table.clone(),
                    });
                }
            }
            _ => {}
        }

        if entry.has_destination() && !entry.dest_field.is_empty() {
            let dest_key = (entry.dest_table.clone(), entry.dest_field.clone());
            if !dest_fields.insert(dest_key) {
                return Err(DictionaryError::DuplicateDestination {
                    table: entry.dest_table.clone(),
                    field: entry.dest_field.clone(),
                });
            }
        }

        if entry.decision == Decision::IncludeScrubbed && !entry.source_datatype.is_text() {
            return Err(DictionaryError::ScrubbedNonText {
                db: entry.source_db.clone(),
                table: entry.source_table.clone(),
                field: entry.source_field.clone(),
            });
        }

        if entry.is_patient_identifier && entry.identifier_kind.is_none() {
            return Err(DictionaryError::IdentifierWithoutKind {
                db: entry.source_db.clone(),
                table: entry.source_table.clone(),
                field: entry.source_field.clone(),
            });
        }
    }

    // Second pass: scrubbed columns may only appear in tables that have a
    // PRIMARY_PID column, otherwise no scrubber can ever exist for them.
    for entry in entries {
        if entry.decision == Decision::IncludeScrubbed {
            let table_key = (entry.source_db.clone(), entry.source_table.clone());
            if !primary_pid_tables.contains(&table_key) {
                return Err(DictionaryError::ScrubbedSystemTable {
                    db: entry.source_db.clone(),
                    table: entry.source_table.clone(),
                    field: entry.source_field.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Check every entry against the introspected source catalog.
///
/// An entry naming a column that does not exist is fatal: it usually
/// means the dictionary is stale against a migrated schema, and a stale
/// dictionary cannot be trusted to cover new columns.
pub fn validate_against_schema(
    entries: &[DataDictionaryEntry],
    schema: &SourceSchema,
) -> Result<(), DictionaryError> {
    for entry in entries {
        // ADD_SOURCE_HASH columns are synthesized, not read from a
        // source column
        if entry.decision == Decision::AddSourceHash {
            continue;
        }
        if !schema.contains(&entry.source_db, &entry.source_table, &entry.source_field) {
            return Err(DictionaryError::UnknownSourceColumn {
                db: entry.source_db.clone(),
                table: entry.source_table.clone(),
                field: entry.source_field.clone(),
            });
        }
    }
    Ok(())
}
