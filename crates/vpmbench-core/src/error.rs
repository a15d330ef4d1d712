//! Crate-level error type.

use crate::config::ConfigError;
use crate::extractor::ExtractError;
use crate::model::ValidationError;
use crate::plugin::PluginError;
use crate::summary::SummaryError;

/// Any failure of a benchmark run that is not confined to a single plugin.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("ground truth is not usable: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error("summary failed: {0}")]
    Summary(#[from] SummaryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("can't serialize payload: {0}")]
    Payload(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, BenchError>;
