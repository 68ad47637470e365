//! The compiled per-patient scrubber
//!
//! A scrubber is immutable once built and owned exclusively by the worker
//! processing its patient. It is never shared across patients and never
//! cached across runs: the identifier set it was compiled from is
//! discarded with it.

use crate::scrub::identifiers::IdentifierKind;
use regex::Regex;

/// One compiled match pattern with its identifier kind
#[derive(Debug, Clone)]
pub struct ScrubPattern {
    /// Compiled regex for one identifier variant
    pub regex: Regex,

    /// Kind of identifier this pattern redacts
    pub kind: IdentifierKind,
}

/// Compiled matcher that redacts one patient's known identifying values
/// (and permissible variants) from free text
#[derive(Debug, Clone)]
pub struct Scrubber {
    patterns: Vec<ScrubPattern>,
}

impl Scrubber {
    /// Assemble a scrubber from compiled patterns.
    ///
    /// Built by [`ScrubberBuilder`](crate::scrub::ScrubberBuilder); an
    /// empty pattern set is legal and yields an identity scrub (a patient
    /// with no recorded identifiers still gets a scrubber, so that the
    /// scrubber-present safety invariant holds).
    pub(crate) fn new(patterns: Vec<ScrubPattern>) -> Self {
        Self { patterns }
    }

    /// Number of compiled patterns
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Redact every match in `text`, replacing it with the placeholder
    /// token of its identifier kind.
    ///
    /// All patterns are matched first, then replacements are applied in a
    /// single left-to-right scan over non-overlapping matches, preferring
    /// the longest match at a given start position. The result is
    /// independent of pattern insertion order.
    pub fn scrub(&self, text: &str) -> String {
        let mut matches: Vec<(usize, usize, IdentifierKind)> = Vec::new();
        for pattern in &self.patterns {
            for m in pattern.regex.find_iter(text) {
                matches.push((m.start(), m.end(), pattern.kind));
            }
        }

        if matches.is_empty() {
            return text.to_string();
        }

        // Longest match wins at equal start; ties broken by kind label so
        // the outcome is deterministic.
        matches.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then(b.1.cmp(&a.1))
                .then(a.2.label().cmp(b.2.label()))
        });

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0usize;
        for (start, end, kind) in matches {
            if start < cursor {
                // Overlaps a match already chosen further left
                continue;
            }
            out.push_str(&text[cursor..start]);
            out.push_str(&kind.placeholder());
            cursor = end;
        }
        out.push_str(&text[cursor..]);
        out
    }
}
