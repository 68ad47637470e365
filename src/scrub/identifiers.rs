//! Identifier kinds and the per-patient identifier set
//!
//! The gather phase accumulates every known identifying value for one
//! patient into a [`PatientIdentifierSet`], keyed by [`IdentifierKind`].
//! The set is built fresh per patient per run and discarded after that
//! patient's rows are written; it is never persisted.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Kind of patient-identifying value
///
/// The kind selects which normalization rules apply when the scrubber is
/// compiled, and which placeholder tag replaces a match in redacted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    /// Personal names (forename, surname, maiden name)
    Name,
    /// Dates tied to the patient (birth, death, admission)
    Date,
    /// National identifiers (NHS number, SSN and similar)
    NationalId,
    /// Postal codes
    Postcode,
    /// Telephone numbers
    Phone,
    /// Email addresses
    Email,
    /// Street addresses
    Address,
}

impl IdentifierKind {
    /// Parse an identifier kind keyword as written in the dictionary file
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "name" => Some(Self::Name),
            "date" | "dob" | "date_of_birth" => Some(Self::Date),
            "national_id" | "nhs_number" | "ssn" => Some(Self::NationalId),
            "postcode" | "zip" => Some(Self::Postcode),
            "phone" | "telephone" => Some(Self::Phone),
            "email" => Some(Self::Email),
            "address" => Some(Self::Address),
            _ => None,
        }
    }

    /// Tag used inside redaction placeholders
    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "NAME",
            Self::Date => "DATE",
            Self::NationalId => "NATIONAL_ID",
            Self::Postcode => "POSTCODE",
            Self::Phone => "PHONE",
            Self::Email => "EMAIL",
            Self::Address => "ADDRESS",
        }
    }

    /// The placeholder token written over a match of this kind
    pub fn placeholder(&self) -> String {
        format!("[REDACTED {}]", self.label())
    }

    /// All kinds, in a fixed order
    pub fn all() -> &'static [IdentifierKind] {
        &[
            Self::Name,
            Self::Date,
            Self::NationalId,
            Self::Postcode,
            Self::Phone,
            Self::Email,
            Self::Address,
        ]
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Known identifying values for one patient, grouped by kind
///
/// Values are deduplicated and ordered so that scrubber compilation is
/// deterministic for a given set.
#[derive(Debug, Clone, Default)]
pub struct PatientIdentifierSet {
    values: HashMap<IdentifierKind, BTreeSet<String>>,
}

impl PatientIdentifierSet {
    /// Create an empty identifier set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one identifying value.
    ///
    /// Empty and whitespace-only values are ignored; the minimum-length
    /// policy is applied later, at scrubber compile time, where the rules
    /// are available.
    pub fn add(&mut self, kind: IdentifierKind, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            return;
        }
        self.values.entry(kind).or_default().insert(value);
    }

    /// Values of one kind, in deterministic order
    pub fn values(&self, kind: IdentifierKind) -> impl Iterator<Item = &str> {
        self.values
            .get(&kind)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Iterate all (kind, value) pairs
    pub fn iter(&self) -> impl Iterator<Item = (IdentifierKind, &str)> {
        self.values
            .iter()
            .flat_map(|(kind, set)| set.iter().map(move |v| (*kind, v.as_str())))
    }

    /// Total number of distinct values across all kinds
    pub fn len(&self) -> usize {
        self.values.values().map(BTreeSet::len).sum()
    }

    /// Whether the set holds no values at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
