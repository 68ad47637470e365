//! Keyed pseudonym hashing
//!
//! Maps real patient identifiers to opaque research identifiers with
//! HMAC-SHA256. The digest is deterministic under a fixed key, so the
//! same patient's rows join on the same destination key across tables
//! and across repeated runs, and it is computationally infeasible to
//! invert without the key.

use crate::domain::ids::{Pid, ResearchId};
use crate::pseudonym::keys::PseudonymKeys;
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Deterministic keyed hasher for pseudonym derivation
///
/// Constructed once at startup from validated key material and shared
/// read-only across all pipeline workers. There is no process-wide
/// mutable key state; the hasher owns its keys explicitly.
pub struct PseudonymHasher {
    keys: PseudonymKeys,
}

impl PseudonymHasher {
    /// Create a hasher from validated key material
    pub fn new(keys: PseudonymKeys) -> Self {
        Self { keys }
    }

    /// Derive the research identifier (RID) for a local PID
    pub fn hash_primary(&self, pid: &Pid) -> ResearchId {
        Self::digest(self.keys.primary.expose_secret().as_ref(), pid.as_str())
    }

    /// Derive the master research identifier (MRID) for a cross-system MPID
    pub fn hash_master(&self, mpid: &Pid) -> ResearchId {
        Self::digest(self.keys.master.expose_secret().as_ref(), mpid.as_str())
    }

    /// Derive the opaque destination key for one source row.
    ///
    /// Source row identities are often built from patient identifiers
    /// (the patients table is usually keyed by the PID itself), so raw
    /// row keys never reach the destination: rows and markers are keyed
    /// by this digest instead.
    pub fn hash_row_identity(&self, source_db: &str, table: &str, row_id: &str) -> ResearchId {
        let scope = format!("{source_db}.{table}:{row_id}");
        Self::digest(self.keys.primary.expose_secret().as_ref(), &scope)
    }

    fn digest(key: &str, value: &str) -> ResearchId {
        let mut mac = HmacSha256::new_from_slice(key.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(value.as_bytes());
        let bytes = mac.finalize().into_bytes();
        let hex = format!("{bytes:x}");
        ResearchId::new(hex).expect("HMAC output is always a hex digest")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;

    fn hasher(primary: &str, master: &str) -> PseudonymHasher {
        PseudonymHasher::new(PseudonymKeys::new(
            secret_string(primary.to_string()),
            secret_string(master.to_string()),
        ))
    }

    #[test]
    fn test_hash_is_deterministic() {
        let pid = Pid::new("42").unwrap();
        let h = hasher("k1", "k2");

        assert_eq!(h.hash_primary(&pid), h.hash_primary(&pid));
    }

    #[test]
    fn test_hash_is_stable_across_instances() {
        // Same key in a fresh hasher must reproduce the same RID,
        // otherwise repeat runs would break destination joins
        let pid = Pid::new("42").unwrap();
        let first = hasher("k1", "k2").hash_primary(&pid);
        let second = hasher("k1", "k2").hash_primary(&pid);
        assert_eq!(first, second);
    }

    #[test]
    fn test_key_change_changes_digest() {
        let pid = Pid::new("42").unwrap();
        let rid_k1 = hasher("k1", "m").hash_primary(&pid);
        let rid_k2 = hasher("k2", "m").hash_primary(&pid);
        assert_ne!(rid_k1, rid_k2);
    }

    #[test]
    fn test_distinct_pids_yield_distinct_rids() {
        let h = hasher("k1", "k2");
        let a = h.hash_primary(&Pid::new("42").unwrap());
        let b = h.hash_primary(&Pid::new("43").unwrap());
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_scopes_are_independent() {
        // The same identifier value must map to different pseudonyms in
        // the primary and master scopes
        let pid = Pid::new("9434765919").unwrap();
        let h = hasher("k1", "k2");
        assert_ne!(h.hash_primary(&pid), h.hash_master(&pid));
    }

    #[test]
    fn test_row_identity_is_scoped_by_table() {
        let h = hasher("k1", "k2");
        let digest = h.hash_row_identity("ehr", "patients", "42");
        // Same row, same digest; different table, different digest
        assert_eq!(digest, h.hash_row_identity("ehr", "patients", "42"));
        assert_ne!(digest, h.hash_row_identity("ehr", "visits", "42"));
    }

    #[test]
    fn test_digest_is_wide_hex() {
        let h = hasher("k1", "k2");
        let rid = h.hash_primary(&Pid::new("42").unwrap());
        assert_eq!(rid.as_str().len(), 64);
        assert!(rid.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }
}
