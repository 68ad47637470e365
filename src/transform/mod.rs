//! Field transformation
//!
//! Applies the dictionary's per-column decisions to source rows:
//! dropping, copying, scrubbing, pseudonymizing, and appending content
//! hashes for incremental change detection.

pub mod content_hash;
pub mod engine;

pub use content_hash::row_content_hash;
pub use engine::transform_row;
