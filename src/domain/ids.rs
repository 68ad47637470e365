//! Domain identifier types with validation
//!
//! This module provides newtype wrappers for patient and research
//! identifiers. Each type ensures type safety so that a raw patient
//! identifier can never be written where a pseudonym is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Patient identifier newtype wrapper
///
/// Represents the identifier of a patient in a source system (local PID)
/// or across systems (master PID). Raw PIDs exist only inside the
/// pipeline; they are hashed before anything reaches the destination.
///
/// # Examples
///
/// ```
/// use veil::domain::ids::Pid;
/// use std::str::FromStr;
///
/// let pid = Pid::from_str("42").unwrap();
/// assert_eq!(pid.as_str(), "42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pid(String);

impl Pid {
    /// Creates a new Pid from a string
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier is empty or whitespace-only.
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Patient identifier cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the PID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Pid {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Pid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Research pseudonym newtype wrapper
///
/// A deterministic, non-reversible pseudonym derived from a PID (RID) or
/// master PID (MRID) by the keyed hasher. Stable across runs under the
/// same key, so it serves as the destination join key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResearchId(String);

impl ResearchId {
    /// Wraps a hex digest produced by the pseudonym hasher.
    ///
    /// # Errors
    ///
    /// Returns an error if the digest is empty or contains non-hex
    /// characters.
    pub fn new(digest: impl Into<String>) -> Result<Self, String> {
        let digest = digest.into();
        if digest.is_empty() {
            return Err("Research identifier cannot be empty".to_string());
        }
        if !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err("Research identifier must be a hex digest".to_string());
        }
        Ok(Self(digest))
    }

    /// Returns the pseudonym as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ResearchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ResearchId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Run identifier
///
/// A fresh UUID minted per pipeline execution, stamped on row markers and
/// the run summary so that incremental state can be traced back to the
/// run that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Mint a new random run identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| format!("Invalid run id: {e}"))
    }
}
