//! Pseudonym key material
//!
//! Two independent key scopes exist: the primary key derives RIDs from
//! local PIDs, the master key derives MRIDs from cross-system MPIDs.
//! Possession of one pseudonym space must not reveal the other, so the
//! keys are never derived from each other.
//!
//! Keys are held in [`SecretString`] wrappers: zeroized on drop, redacted
//! in Debug output, never logged and never written to the destination.

use crate::config::SecretString;
use secrecy::ExposeSecret;

/// The two pseudonym hashing keys
#[derive(Clone)]
pub struct PseudonymKeys {
    /// Key for PRIMARY_PID -> RID derivation
    pub primary: SecretString,

    /// Key for MASTER_PID -> MRID derivation
    pub master: SecretString,
}

impl PseudonymKeys {
    /// Create a key pair from already-loaded secrets
    pub fn new(primary: SecretString, master: SecretString) -> Self {
        Self { primary, master }
    }

    /// Validate the key material.
    ///
    /// A missing or zero-length key is a fatal configuration error:
    /// hashing with an empty key would silently produce guessable
    /// pseudonyms. Rotating a key is intentional and invalidates all
    /// previously produced pseudonyms in that scope.
    pub fn validate(&self) -> Result<(), String> {
        if self.primary.expose_secret().is_empty() {
            return Err("keys.primary_key cannot be empty".to_string());
        }
        if self.master.expose_secret().is_empty() {
            return Err("keys.master_key cannot be empty".to_string());
        }
        if self.primary.expose_secret().as_ref() == self.master.expose_secret().as_ref() {
            return Err(
                "keys.primary_key and keys.master_key must be independent".to_string(),
            );
        }
        Ok(())
    }
}

impl std::fmt::Debug for PseudonymKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material is never printed
        f.debug_struct("PseudonymKeys").finish_non_exhaustive()
    }
}
