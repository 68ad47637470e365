//! Field transform engine
//!
//! Applies one dictionary-declared decision to one source value,
//! consulting the pseudonym hasher and the active scrubber as needed.
//! The decision enum is matched exhaustively: a new decision cannot
//! compile without a branch here.
//!
//! Failure severity is split deliberately. A value that contradicts its
//! declared datatype is a data-quality problem: the row is skipped and
//! the run continues. A scrubbed column with no active scrubber is a
//! pipeline defect that could leak identifiers: the engine returns a
//! fatal error and the run halts.

use crate::dictionary::{Decision, TablePolicy};
use crate::domain::errors::{RowTransformError, VeilError};
use crate::domain::{Pid, Result, SourceRow, SqlValue, TransformedRow};
use crate::pseudonym::PseudonymHasher;
use crate::scrub::Scrubber;
use crate::transform::content_hash::row_content_hash;

/// Transform one source row under its table policy.
///
/// Returns `Ok(None)` when every column is OMIT (the row has no
/// destination). The scrubber is `None` only for system tables; passing
/// `None` for a patient table whose policy includes INCLUDE_SCRUBBED is
/// the fatal [`VeilError::ScrubUnavailable`] condition.
///
/// # Errors
///
/// - [`VeilError::RowTransform`] for datatype mismatches, missing
///   columns, or unexpected nulls: recoverable, skip the row.
/// - [`VeilError::ScrubUnavailable`]: fatal, halt the run.
pub fn transform_row(
    policy: &TablePolicy,
    row: &SourceRow,
    scrubber: Option<&Scrubber>,
    hasher: &PseudonymHasher,
) -> Result<Option<TransformedRow>> {
    let Some(dest_table) = policy
        .entries
        .iter()
        .find(|e| e.has_destination())
        .map(|e| e.dest_table.clone())
    else {
        return Ok(None);
    };

    let mut out = TransformedRow::new(dest_table, row.row_id.clone());

    for entry in &policy.entries {
        if entry.decision == Decision::AddSourceHash {
            // Content hash is derived from the whole row, not one value
            out.insert(
                entry.dest_field.clone(),
                SqlValue::Text(row_content_hash(row)),
            );
            continue;
        }

        let value = row.get(&entry.source_field).ok_or_else(|| {
            RowTransformError::MissingColumn {
                table: entry.source_table.clone(),
                column: entry.source_field.clone(),
            }
        })?;

        if !entry.source_datatype.accepts(value) {
            return Err(RowTransformError::DatatypeMismatch {
                table: entry.source_table.clone(),
                column: entry.source_field.clone(),
                expected: entry.source_datatype.keyword().to_string(),
            }
            .into());
        }

        match entry.decision {
            Decision::Omit => {}
            Decision::IncludeVerbatim => {
                out.insert(entry.dest_field.clone(), value.clone());
            }
            Decision::IncludeScrubbed => {
                let scrubber = scrubber.ok_or_else(|| VeilError::ScrubUnavailable {
                    table: entry.source_table.clone(),
                    column: entry.source_field.clone(),
                })?;
                let scrubbed = match value {
                    SqlValue::Null => SqlValue::Null,
                    // Datatype validation above guarantees text here
                    other => SqlValue::Text(scrubber.scrub(&other.render())),
                };
                out.insert(entry.dest_field.clone(), scrubbed);
            }
            Decision::PrimaryPid => {
                let pid = required_pid(entry_context(entry), value)?;
                out.insert(
                    entry.dest_field.clone(),
                    SqlValue::Text(hasher.hash_primary(&pid).into_inner()),
                );
            }
            Decision::MasterPid => {
                let pid = required_pid(entry_context(entry), value)?;
                out.insert(
                    entry.dest_field.clone(),
                    SqlValue::Text(hasher.hash_master(&pid).into_inner()),
                );
            }
            Decision::AddSourceHash => unreachable!("handled above"),
        }
    }

    Ok(Some(out))
}

fn entry_context(entry: &crate::dictionary::DataDictionaryEntry) -> (String, String) {
    (entry.source_table.clone(), entry.source_field.clone())
}

/// PID columns must hold a non-null, non-empty value: the pseudonym is
/// the destination join key.
fn required_pid((table, column): (String, String), value: &SqlValue) -> Result<Pid> {
    if value.is_null() {
        return Err(RowTransformError::UnexpectedNull { table, column }.into());
    }
    Pid::new(value.render())
        .map_err(|_| RowTransformError::UnexpectedNull { table, column }.into())
}
