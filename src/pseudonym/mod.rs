//! Pseudonym derivation: keyed hashing of patient identifiers
//!
//! `RID = HMAC-SHA256(primary_key, PID)` and
//! `MRID = HMAC-SHA256(master_key, MPID)`. The mapping is a derivable
//! function, not a stored table: nothing in the hot path persists the
//! PID-to-RID relationship.

pub mod hasher;
pub mod keys;

pub use hasher::PseudonymHasher;
pub use keys::PseudonymKeys;
