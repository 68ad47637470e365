//! Domain models and types for Veil.
//!
//! This module contains the core domain models, types, and business rules
//! for the de-identification pipeline.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`Pid`], [`ResearchId`], [`RunId`])
//! - **Row models** ([`SourceRow`], [`TransformedRow`], [`SqlValue`])
//! - **Error types** ([`VeilError`], [`DictionaryError`], [`RowTransformError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Veil uses the newtype pattern so that a raw patient identifier can
//! never be passed where a research pseudonym is expected:
//!
//! ```rust
//! use veil::domain::{Pid, ResearchId};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pid = Pid::new("42")?;
//! let rid = ResearchId::new("deadbeef")?;
//!
//! // This won't compile - type safety prevents mixing identifiers
//! // let wrong: ResearchId = pid;  // Compile error!
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod ids;
pub mod result;
pub mod value;

// Re-export commonly used types for convenience
pub use errors::{DictionaryError, RowTransformError, VeilError};
pub use ids::{Pid, ResearchId, RunId};
pub use result::Result;
pub use value::{SourceRow, SqlValue, TransformedRow};
