//! Pipeline orchestration
//!
//! The coordinator sequences the two-phase per-patient protocol (gather
//! identifiers, then transform and write), runs patients through a
//! bounded worker pool, processes system tables without a scrubber, and
//! drives full vs incremental runs via row markers.

pub mod coordinator;
pub mod gather;
pub mod marker;
pub mod summary;

pub use coordinator::PipelineCoordinator;
pub use marker::RowMarker;
pub use summary::{RowErrorReport, RunSummary, UnitOutcome};
