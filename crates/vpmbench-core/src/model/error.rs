//! Error types for the canonical record model.

/// An enum lookup found no entry for a raw value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("can't resolve {kind} from '{raw}'")]
pub struct ResolutionError {
    /// What was being resolved (e.g. "pathogenicity class").
    pub kind: &'static str,
    /// The offending raw value, verbatim.
    pub raw: String,
}

impl ResolutionError {
    pub fn new(kind: &'static str, raw: impl Into<String>) -> Self {
        Self {
            kind,
            raw: raw.into(),
        }
    }
}

/// A single schema violation found while assembling a table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("row {row}: position must be greater than 0")]
    NonPositivePosition { row: usize },

    #[error("row {row}: chromosome '{value}' is not one of 1-22, X, Y")]
    NonCanonicalChromosome { row: usize, value: String },

    #[error("row {row}: {field} allele '{value}' is not a nucleotide string")]
    InvalidAllele {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("row {row}: reference genome {found} differs from {expected} used by row 0")]
    MixedReferenceGenome {
        row: usize,
        expected: String,
        found: String,
    },

    #[error("row {row}: pathogenicity class is unknown, no ground truth available")]
    UnlabelledRecord { row: usize },

    #[error("table contains no records")]
    EmptyTable,
}

/// Parsed data violates the canonical record model.
///
/// Carries every violation found, not only the first one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} schema violation(s): {}", violations.len(), summarize(violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

const SHOWN_VIOLATIONS: usize = 5;

fn summarize(violations: &[Violation]) -> String {
    let mut shown: Vec<String> = violations
        .iter()
        .take(SHOWN_VIOLATIONS)
        .map(ToString::to_string)
        .collect();
    if violations.len() > SHOWN_VIOLATIONS {
        shown.push(format!("... {} more", violations.len() - SHOWN_VIOLATIONS));
    }
    shown.join("; ")
}
