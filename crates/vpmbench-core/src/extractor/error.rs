//! Error types for the extractor layer.

use std::path::PathBuf;

use crate::model::{ResolutionError, ValidationError};

/// Why a format hook could not turn a file into records.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: missing column '{column}'")]
    MissingColumn { line: u64, column: String },

    #[error("line {line}: {reason}")]
    Malformed { line: u64, reason: String },

    #[error("line {line}: {source}")]
    Resolution {
        line: u64,
        #[source]
        source: ResolutionError,
    },
}

impl ParseError {
    pub fn malformed(line: u64, reason: impl Into<String>) -> Self {
        Self::Malformed {
            line,
            reason: reason.into(),
        }
    }

    /// Adapter for `map_err` on resolution lookups.
    pub fn resolution(line: u64) -> impl FnOnce(ResolutionError) -> Self {
        move |source| Self::Resolution { line, source }
    }
}

/// Failure of [`Extractor::extract`](super::Extractor::extract).
///
/// Every variant names the extractor and the file it was reading.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("can't parse '{}' with {extractor}: {source}", path.display())]
    Extraction {
        extractor: String,
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("can't resolve a value at line {line} of '{}' with {extractor}: {source}", path.display())]
    Resolution {
        extractor: String,
        path: PathBuf,
        line: u64,
        #[source]
        source: ResolutionError,
    },

    #[error("data extracted from '{}' with {extractor} is invalid: {source}", path.display())]
    Validation {
        extractor: String,
        path: PathBuf,
        #[source]
        source: ValidationError,
    },
}

impl ExtractError {
    pub(crate) fn from_parse(extractor: &str, path: PathBuf, err: ParseError) -> Self {
        match err {
            ParseError::Resolution { line, source } => Self::Resolution {
                extractor: extractor.to_string(),
                path,
                line,
                source,
            },
            other => Self::Extraction {
                extractor: extractor.to_string(),
                path,
                source: other,
            },
        }
    }

    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Extraction { path, .. }
            | Self::Resolution { path, .. }
            | Self::Validation { path, .. } => path,
        }
    }
}
