//! Per-patient free-text scrubbing
//!
//! The gather phase of the pipeline accumulates a patient's known
//! identifying values into a [`PatientIdentifierSet`]; the
//! [`ScrubberBuilder`] compiles that set into an immutable [`Scrubber`]
//! which redacts every occurrence (and permissible variant) of those
//! values from free text, replacing matches with `[REDACTED <KIND>]`
//! placeholders so downstream text stays analyzable for structure.
//!
//! The variant policy ([`ScrubRules`]) is data, not code: an embedded
//! TOML table, overridable per deployment.
//!
//! # Usage
//!
//! ```rust
//! use veil::scrub::{IdentifierKind, PatientIdentifierSet, ScrubberBuilder};
//!
//! # fn example() -> anyhow::Result<()> {
//! let mut set = PatientIdentifierSet::new();
//! set.add(IdentifierKind::Name, "John");
//! set.add(IdentifierKind::Date, "1980-01-02");
//!
//! let scrubber = ScrubberBuilder::with_default_rules()?.build(&set)?;
//! assert_eq!(
//!     scrubber.scrub("Seen John on 02/01/1980."),
//!     "Seen [REDACTED NAME] on [REDACTED DATE]."
//! );
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod identifiers;
pub mod rules;
pub mod scrubber;

pub use builder::ScrubberBuilder;
pub use identifiers::{IdentifierKind, PatientIdentifierSet};
pub use rules::ScrubRules;
pub use scrubber::Scrubber;
