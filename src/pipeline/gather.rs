//! Identifier gather phase
//!
//! Phase one of the per-patient protocol: read every row of the
//! patient's across all tables that carry identifier-flagged columns and
//! accumulate the values into one [`PatientIdentifierSet`]. The phase
//! must complete in full before a scrubber is built; a scrubber compiled
//! from a partial set is unsafe.

use crate::adapters::retry::with_retry;
use crate::adapters::traits::SourceDatabase;
use crate::config::RetryConfig;
use crate::dictionary::TablePolicy;
use crate::domain::{Pid, Result};
use crate::scrub::PatientIdentifierSet;

/// Gather one patient's known identifying values from every table that
/// declares identifier columns.
///
/// Values are rendered canonically ([`crate::domain::SqlValue::render`])
/// so a date of birth stored as a SQL date arrives as `YYYY-MM-DD`, ready
/// for variant expansion at scrubber compile time.
pub async fn gather_identifier_set(
    source: &dyn SourceDatabase,
    policies: &[TablePolicy],
    pid: &Pid,
    retry: &RetryConfig,
) -> Result<PatientIdentifierSet> {
    let mut set = PatientIdentifierSet::new();

    for policy in policies.iter().filter(|p| p.has_identifier_columns()) {
        let rows = with_retry(retry, "gather identifier rows", || {
            source.fetch_patient_rows(policy, pid)
        })
        .await?;

        for row in &rows {
            for entry in policy.identifier_entries() {
                // Validated dictionaries guarantee a kind on identifier
                // columns
                let Some(kind) = entry.identifier_kind else {
                    continue;
                };
                if let Some(value) = row.get(&entry.source_field) {
                    if !value.is_null() {
                        set.add(kind, value.render());
                    }
                }
            }
        }
    }

    tracing::debug!(
        pid = %pid,
        values = set.len(),
        "Gathered identifier set"
    );

    Ok(set)
}
