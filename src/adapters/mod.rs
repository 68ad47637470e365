//! External integrations
//!
//! Database adapters behind the [`traits`] seam, plus the bounded-retry
//! helper used around connectivity-sensitive calls. The pipeline only
//! depends on the traits; PostgreSQL is the shipped implementation.

pub mod postgres;
pub mod retry;
pub mod traits;

pub use traits::{DestinationDatabase, MarkerStore, SourceDatabase, WriteFailure, WriteOutcome};
