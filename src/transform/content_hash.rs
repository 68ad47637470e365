//! Source row content hashing
//!
//! Produces the deterministic digest stored in ADD_SOURCE_HASH columns
//! and incremental-run markers. Hashing is over a canonical rendering of
//! the row (columns in name order, one `name=value` line each), so that
//! semantically identical rows hash identically regardless of how the
//! adapter assembled them.

use crate::domain::SourceRow;
use sha2::{Digest, Sha256};

/// Calculate the SHA-256 content hash of a source row.
///
/// Returns a hex-encoded digest (64 characters). The hash covers every
/// column value in the row, NULLs included, but not the row's table name
/// or identity: moving an unchanged row is not a content change.
///
/// # Examples
///
/// ```
/// use veil::domain::{SourceRow, SqlValue};
/// use veil::transform::content_hash::row_content_hash;
///
/// let row = SourceRow::new("ehr", "patients", "42")
///     .with_column("forename", SqlValue::Text("John".into()));
/// assert_eq!(row_content_hash(&row).len(), 64);
/// ```
pub fn row_content_hash(row: &SourceRow) -> String {
    let mut hasher = Sha256::new();
    for (name, value) in &row.columns {
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(value.render().as_bytes());
        hasher.update(b"\n");
    }
    let result = hasher.finalize();
    format!("{result:x}")
}
