//! Score interpretation: raw plugin output to binary pathogenic/benign calls.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::ResolutionError;

/// Decision rule turning one raw score into a binary call.
///
/// Comparisons are strict; a value equal to the threshold is benign (0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCutoff", into = "RawCutoff")]
pub enum CutoffSpec {
    /// Pathogenic when `value > threshold`.
    GreaterThan(f64),
    /// Pathogenic when `value < threshold`.
    LessThan(f64),
    /// The plugin already emits classes; the value is rounded.
    Direct,
}

impl CutoffSpec {
    /// Binary call for a single value. NaN is always benign.
    pub fn classify(&self, value: f64) -> u8 {
        let pathogenic = match *self {
            Self::GreaterThan(threshold) => value > threshold,
            Self::LessThan(threshold) => value < threshold,
            Self::Direct => value.round() >= 1.0,
        };
        u8::from(pathogenic)
    }

    fn from_parts(direction: Option<&str>, threshold: f64) -> Result<Self, ResolutionError> {
        if threshold.is_nan() {
            return Err(ResolutionError::new("cutoff threshold", threshold.to_string()));
        }
        match direction.map(|d| d.trim().to_ascii_lowercase()).as_deref() {
            Some("greater") | Some("greater-than") | Some(">") => Ok(Self::GreaterThan(threshold)),
            Some("less") | Some("less-than") | Some("<") => Ok(Self::LessThan(threshold)),
            None | Some("") | Some("direct") => Ok(Self::Direct),
            Some(other) => Err(ResolutionError::new("cutoff direction", other)),
        }
    }
}

impl FromStr for CutoffSpec {
    type Err = ResolutionError;

    /// Accepts `greater 0.5`, `less 0.5`, `direct`, or a bare number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(only), None, None) => match only.parse::<f64>() {
                Ok(threshold) => Self::from_parts(None, threshold),
                Err(_) if only.eq_ignore_ascii_case("direct") => Ok(Self::Direct),
                Err(_) => Err(ResolutionError::new("cutoff", s)),
            },
            (Some(direction), Some(threshold), None) => {
                let threshold = threshold
                    .parse::<f64>()
                    .map_err(|_| ResolutionError::new("cutoff threshold", threshold))?;
                Self::from_parts(Some(direction), threshold)
            }
            _ => Err(ResolutionError::new("cutoff", s)),
        }
    }
}

impl fmt::Display for CutoffSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GreaterThan(t) => write!(f, "greater {t}"),
            Self::LessThan(t) => write!(f, "less {t}"),
            Self::Direct => f.write_str("direct"),
        }
    }
}

/// Manifest spellings of a cutoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawCutoff {
    Number(f64),
    Text(String),
    Table {
        #[serde(default)]
        direction: Option<String>,
        threshold: f64,
    },
}

impl TryFrom<RawCutoff> for CutoffSpec {
    type Error = ResolutionError;

    fn try_from(raw: RawCutoff) -> Result<Self, Self::Error> {
        match raw {
            RawCutoff::Number(_) => Ok(Self::Direct),
            RawCutoff::Text(text) => text.parse(),
            RawCutoff::Table {
                direction,
                threshold,
            } => Self::from_parts(direction.as_deref(), threshold),
        }
    }
}

impl From<CutoffSpec> for RawCutoff {
    fn from(cutoff: CutoffSpec) -> Self {
        RawCutoff::Text(cutoff.to_string())
    }
}

/// Apply `cutoff` to every value, preserving order and length.
pub fn interpret(scores: &[f64], cutoff: &CutoffSpec) -> Vec<u8> {
    scores.iter().map(|&value| cutoff.classify(value)).collect()
}

/// Raw output of one successful plugin run, row-aligned with the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    plugin: String,
    values: Vec<f64>,
    cutoff: CutoffSpec,
}

impl Score {
    pub fn new(plugin: impl Into<String>, values: Vec<f64>, cutoff: CutoffSpec) -> Self {
        Self {
            plugin: plugin.into(),
            values,
            cutoff,
        }
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn cutoff(&self) -> CutoffSpec {
        self.cutoff
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Binary calls under the plugin's own cutoff.
    pub fn interpret(&self) -> Vec<u8> {
        interpret(&self.values, &self.cutoff)
    }
}
