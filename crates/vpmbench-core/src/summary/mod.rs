//! Performance summaries and metrics.
//!
//! A summary turns a [`Score`] plus ground truth into a JSON mapping
//! (confusion matrix, curves); a metric turns them into one number. Both are
//! looked up by display name in a [`Registry`] that each module fills through
//! its `register` function.
//!
//! # Modules
//!
//! - [`registry`]  - generic name → factory `Registry`
//! - [`confusion`] - Confusion Matrix
//! - [`curves`]    - ROC Curve, Precision-Recall Curve
//! - [`metrics`]   - sensitivity, specificity, precision, NPV, accuracy, MCC, AUROC

pub mod confusion;
pub mod curves;
pub mod metrics;
pub mod registry;

use crate::interpret::Score;

pub use confusion::{ConfusionCounts, ConfusionMatrix};
pub use curves::{PrecisionRecallCurve, RocCurve};
pub use metrics::{AreaUnderRoc, CountMetric};
pub use registry::Registry;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SummaryError {
    #[error("{scores} scores but {truth} ground truth labels")]
    LengthMismatch { scores: usize, truth: usize },

    #[error("label {value} at index {index} is not 0 or 1")]
    NonBinaryLabel { index: usize, value: u8 },

    #[error("no scores to summarize")]
    Empty,
}

/// A named statistic producing a JSON mapping.
pub trait PerformanceSummary: Send + Sync {
    fn name(&self) -> &'static str;

    fn calculate(&self, score: &Score, truth: &[u8]) -> Result<serde_json::Value, SummaryError>;
}

/// A named statistic producing a single number.
pub trait PerformanceMetric: Send + Sync {
    fn name(&self) -> &'static str;

    fn calculate(&self, score: &Score, truth: &[u8]) -> Result<f64, SummaryError>;
}

pub type SummaryRegistry = Registry<dyn PerformanceSummary>;
pub type MetricRegistry = Registry<dyn PerformanceMetric>;

impl Registry<dyn PerformanceSummary> {
    /// Confusion Matrix, ROC Curve and Precision-Recall Curve.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        confusion::register(&mut registry);
        curves::register(&mut registry);
        registry
    }
}

impl Registry<dyn PerformanceMetric> {
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        metrics::register(&mut registry);
        registry
    }
}

/// Scores and labels must be row-aligned and labels binary.
pub(crate) fn check_inputs(scores: &[f64], truth: &[u8]) -> Result<(), SummaryError> {
    if scores.len() != truth.len() {
        return Err(SummaryError::LengthMismatch {
            scores: scores.len(),
            truth: truth.len(),
        });
    }
    if let Some((index, &value)) = truth.iter().enumerate().find(|&(_, &v)| v > 1) {
        return Err(SummaryError::NonBinaryLabel { index, value });
    }
    Ok(())
}
