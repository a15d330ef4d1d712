//! Confusion matrix of interpreted calls against ground truth.

use serde::{Deserialize, Serialize};

use super::{check_inputs, PerformanceSummary, SummaryError, SummaryRegistry};
use crate::interpret::Score;

/// Counts of a binary confusion matrix, positive class = pathogenic (1).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub tn: u64,
    pub fp: u64,
    #[serde(rename = "fn")]
    pub fn_: u64,
    pub tp: u64,
}

impl ConfusionCounts {
    /// Tally `predicted` against `truth`; both must be 0/1 and aligned.
    pub fn from_calls(predicted: &[u8], truth: &[u8]) -> Result<Self, SummaryError> {
        if predicted.len() != truth.len() {
            return Err(SummaryError::LengthMismatch {
                scores: predicted.len(),
                truth: truth.len(),
            });
        }
        let mut counts = Self::default();
        for (index, (&call, &label)) in predicted.iter().zip(truth).enumerate() {
            match (call, label) {
                (1, 1) => counts.tp += 1,
                (1, 0) => counts.fp += 1,
                (0, 0) => counts.tn += 1,
                (0, 1) => counts.fn_ += 1,
                (0 | 1, value) | (value, _) => {
                    return Err(SummaryError::NonBinaryLabel { index, value })
                }
            }
        }
        Ok(counts)
    }

    /// Interpreted calls of `score` against `truth`.
    pub fn of_score(score: &Score, truth: &[u8]) -> Result<Self, SummaryError> {
        check_inputs(score.values(), truth)?;
        Self::from_calls(&score.interpret(), truth)
    }

    pub fn total(&self) -> u64 {
        self.tn + self.fp + self.fn_ + self.tp
    }
}

/// `{tn, fp, fn, tp}` with labels ordered `[1, 0]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfusionMatrix;

impl PerformanceSummary for ConfusionMatrix {
    fn name(&self) -> &'static str {
        "Confusion Matrix"
    }

    fn calculate(&self, score: &Score, truth: &[u8]) -> Result<serde_json::Value, SummaryError> {
        let counts = ConfusionCounts::of_score(score, truth)?;
        Ok(serde_json::json!({
            "tn": counts.tn,
            "fp": counts.fp,
            "fn": counts.fn_,
            "tp": counts.tp,
        }))
    }
}

pub fn register(registry: &mut SummaryRegistry) {
    registry.register("Confusion Matrix", || Box::new(ConfusionMatrix));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpret::CutoffSpec;

    #[test]
    fn test_counts_sum_to_records() {
        let score = Score::new(
            "m",
            vec![0.9, 0.8, 0.2, 0.1, 0.7, 0.3],
            CutoffSpec::GreaterThan(0.5),
        );
        let truth = [1, 0, 1, 0, 1, 0];
        let counts = ConfusionCounts::of_score(&score, &truth).unwrap();
        assert_eq!(
            counts,
            ConfusionCounts {
                tn: 2,
                fp: 1,
                fn_: 1,
                tp: 2
            }
        );
        assert_eq!(counts.total(), truth.len() as u64);
    }

    #[test]
    fn test_json_keys() {
        let score = Score::new("m", vec![0.9, 0.1], CutoffSpec::GreaterThan(0.5));
        let value = ConfusionMatrix.calculate(&score, &[1, 0]).unwrap();
        assert_eq!(value, serde_json::json!({"tn": 1, "fp": 0, "fn": 0, "tp": 1}));
    }

    #[test]
    fn test_rejects_bad_inputs() {
        assert!(matches!(
            ConfusionCounts::from_calls(&[1, 0], &[1]),
            Err(SummaryError::LengthMismatch { .. })
        ));
        assert!(matches!(
            ConfusionCounts::from_calls(&[1, 0], &[1, 2]),
            Err(SummaryError::NonBinaryLabel { index: 1, value: 2 })
        ));
    }
}
