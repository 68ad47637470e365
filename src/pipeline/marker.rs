//! Row markers for incremental-run change detection
//!
//! One marker per transformed source row, stored in the destination's
//! control table. A marker records the content hash of the source row at
//! the time it was last transformed; the next incremental run compares
//! the current hash against it and skips unchanged rows entirely.
//!
//! Markers are keyed by the row-identity digest, never by the raw source
//! row key, so the control table carries no patient identifiers.

use crate::domain::ids::RunId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Incremental-run state for one destination row
///
/// # Examples
///
/// ```
/// use veil::pipeline::marker::RowMarker;
/// use veil::domain::ids::RunId;
/// use chrono::Utc;
///
/// let marker = RowMarker::new(
///     "a1b2c3".to_string(),
///     "deadbeef".to_string(),
///     RunId::generate(),
/// );
/// assert!(marker.is_unchanged("deadbeef"));
/// assert!(!marker.is_unchanged("0ther"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowMarker {
    /// Row-identity digest (primary key in the control table)
    pub row_key: String,

    /// Content hash of the source row at last transform
    pub content_hash: String,

    /// Run that produced this marker
    pub run_id: RunId,

    /// When the row was last transformed
    pub transformed_at: DateTime<Utc>,
}

impl RowMarker {
    /// Create a marker for a freshly transformed row
    pub fn new(row_key: String, content_hash: String, run_id: RunId) -> Self {
        Self {
            row_key,
            content_hash,
            run_id,
            transformed_at: Utc::now(),
        }
    }

    /// Whether the source row is unchanged since this marker was written
    pub fn is_unchanged(&self, current_content_hash: &str) -> bool {
        self.content_hash == current_content_hash
    }

    /// Refresh the marker after re-transforming a changed row
    pub fn update(&mut self, content_hash: String, run_id: RunId) {
        self.content_hash = content_hash;
        self.run_id = run_id;
        self.transformed_at = Utc::now();
    }
}
