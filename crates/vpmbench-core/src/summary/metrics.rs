//! Single-number performance metrics.
//!
//! Ratios with a zero denominator are NaN, never an error.

use super::confusion::ConfusionCounts;
use super::curves::{area_under, roc_curve};
use super::{MetricRegistry, PerformanceMetric, SummaryError};
use crate::interpret::Score;

type Formula = fn(&ConfusionCounts) -> f64;

/// A metric computed from the confusion matrix of interpreted calls.
#[derive(Debug, Clone, Copy)]
pub struct CountMetric {
    name: &'static str,
    formula: Formula,
}

impl CountMetric {
    pub const fn new(name: &'static str, formula: Formula) -> Self {
        Self { name, formula }
    }

    pub fn of_counts(&self, counts: &ConfusionCounts) -> f64 {
        (self.formula)(counts)
    }
}

impl PerformanceMetric for CountMetric {
    fn name(&self) -> &'static str {
        self.name
    }

    fn calculate(&self, score: &Score, truth: &[u8]) -> Result<f64, SummaryError> {
        Ok(self.of_counts(&ConfusionCounts::of_score(score, truth)?))
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        f64::NAN
    } else {
        numerator as f64 / denominator as f64
    }
}

pub const SENSITIVITY: CountMetric = CountMetric::new("Sensitivity", |c| ratio(c.tp, c.tp + c.fn_));
pub const SPECIFICITY: CountMetric = CountMetric::new("Specificity", |c| ratio(c.tn, c.tn + c.fp));
pub const PRECISION: CountMetric = CountMetric::new("Precision", |c| ratio(c.tp, c.tp + c.fp));
pub const NEGATIVE_PREDICTIVE_VALUE: CountMetric =
    CountMetric::new("Negative Predictive Value", |c| ratio(c.tn, c.tn + c.fn_));
pub const ACCURACY: CountMetric = CountMetric::new("Accuracy", |c| ratio(c.tp + c.tn, c.total()));
pub const MATTHEWS_CORRELATION: CountMetric =
    CountMetric::new("Matthews Correlation Coefficient", mcc);

fn mcc(c: &ConfusionCounts) -> f64 {
    let (tp, tn, fp, fn_) = (c.tp as f64, c.tn as f64, c.fp as f64, c.fn_ as f64);
    let denominator = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();
    if denominator == 0.0 {
        f64::NAN
    } else {
        (tp * tn - fp * fn_) / denominator
    }
}

/// Area under the ROC curve of the raw scores.
#[derive(Debug, Clone, Copy, Default)]
pub struct AreaUnderRoc;

impl PerformanceMetric for AreaUnderRoc {
    fn name(&self) -> &'static str {
        "Area Under ROC Curve"
    }

    fn calculate(&self, score: &Score, truth: &[u8]) -> Result<f64, SummaryError> {
        let roc = roc_curve(truth, score.values())?;
        Ok(area_under(&roc.fpr, &roc.tpr))
    }
}

pub fn register(registry: &mut MetricRegistry) {
    for metric in [
        SENSITIVITY,
        SPECIFICITY,
        PRECISION,
        NEGATIVE_PREDICTIVE_VALUE,
        ACCURACY,
        MATTHEWS_CORRELATION,
    ] {
        registry.register(metric.name, move || Box::new(metric));
    }
    registry.register("Area Under ROC Curve", || Box::new(AreaUnderRoc));
}
