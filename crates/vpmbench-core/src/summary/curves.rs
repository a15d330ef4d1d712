//! ROC and precision-recall curves over raw scores.
//!
//! Conventions follow scikit-learn's `roc_curve` (intermediate collinear
//! points dropped) and `precision_recall_curve`, with one difference: the
//! extra leading ROC threshold is `max(score) + 1` instead of infinity so the
//! curve stays representable in JSON.

use serde::{Deserialize, Serialize};

use super::{check_inputs, PerformanceSummary, SummaryError, SummaryRegistry};
use crate::interpret::Score;

/// Cumulative false and true positive counts at each distinct threshold,
/// thresholds in decreasing order.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdCounts {
    pub fps: Vec<f64>,
    pub tps: Vec<f64>,
    pub thresholds: Vec<f64>,
}

/// Tally positives above every distinct score value.
///
/// NaN scores sort below every number.
pub fn binary_clf_curve(truth: &[u8], scores: &[f64]) -> Result<ThresholdCounts, SummaryError> {
    check_inputs(scores, truth)?;
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| descending(scores[a], scores[b]));

    let mut counts = ThresholdCounts {
        fps: Vec::new(),
        tps: Vec::new(),
        thresholds: Vec::new(),
    };
    let mut tp = 0.0;
    for (rank, &idx) in order.iter().enumerate() {
        tp += f64::from(truth[idx]);
        let last_of_value = order
            .get(rank + 1)
            .map_or(true, |&next| !same_value(scores[next], scores[idx]));
        if last_of_value {
            counts.tps.push(tp);
            counts.fps.push((rank + 1) as f64 - tp);
            counts.thresholds.push(scores[idx]);
        }
    }
    Ok(counts)
}

fn descending(a: f64, b: f64) -> std::cmp::Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}

fn same_value(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocPoints {
    pub fpr: Vec<f64>,
    pub tpr: Vec<f64>,
    pub thresholds: Vec<f64>,
}

/// Receiver operating characteristic curve.
///
/// Starts at (0, 0) and ends at (1, 1) when both classes are present. With a
/// class missing the corresponding rate is NaN.
pub fn roc_curve(truth: &[u8], scores: &[f64]) -> Result<RocPoints, SummaryError> {
    let ThresholdCounts {
        mut fps,
        mut tps,
        mut thresholds,
    } = binary_clf_curve(truth, scores)?;
    if thresholds.is_empty() {
        return Err(SummaryError::Empty);
    }

    if fps.len() > 2 {
        let keep: Vec<usize> = (0..fps.len())
            .filter(|&i| i == 0 || i == fps.len() - 1 || bends(&fps, i) || bends(&tps, i))
            .collect();
        fps = keep.iter().map(|&i| fps[i]).collect();
        tps = keep.iter().map(|&i| tps[i]).collect();
        thresholds = keep.iter().map(|&i| thresholds[i]).collect();
    }

    let first = thresholds.first().copied().unwrap_or(f64::NAN);
    thresholds.insert(0, first + 1.0);
    fps.insert(0, 0.0);
    tps.insert(0, 0.0);

    let negatives = fps.last().copied().unwrap_or(0.0);
    let positives = tps.last().copied().unwrap_or(0.0);
    if negatives <= 0.0 {
        tracing::warn!("no negative samples in ground truth, false positive rate is undefined");
    }
    if positives <= 0.0 {
        tracing::warn!("no positive samples in ground truth, true positive rate is undefined");
    }

    Ok(RocPoints {
        fpr: rates(&fps, negatives),
        tpr: rates(&tps, positives),
        thresholds,
    })
}

/// Non-zero second difference at `i`: the curve changes direction there.
fn bends(values: &[f64], i: usize) -> bool {
    values[i + 1] - 2.0 * values[i] + values[i - 1] != 0.0
}

fn rates(counts: &[f64], total: f64) -> Vec<f64> {
    counts
        .iter()
        .map(|&c| if total > 0.0 { c / total } else { f64::NAN })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecisionRecallPoints {
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
    pub thresholds: Vec<f64>,
}

/// Precision-recall pairs for increasing thresholds.
///
/// The last point is precision 1, recall 0 and has no threshold.
pub fn precision_recall_curve(
    truth: &[u8],
    scores: &[f64],
) -> Result<PrecisionRecallPoints, SummaryError> {
    let counts = binary_clf_curve(truth, scores)?;
    if counts.thresholds.is_empty() {
        return Err(SummaryError::Empty);
    }
    let positives = counts.tps.last().copied().unwrap_or(0.0);
    if positives <= 0.0 {
        tracing::warn!("no positive samples in ground truth, recall is set to 1");
    }

    let mut precision: Vec<f64> = counts
        .tps
        .iter()
        .zip(&counts.fps)
        .map(|(&tp, &fp)| if tp + fp > 0.0 { tp / (tp + fp) } else { 0.0 })
        .rev()
        .collect();
    let mut recall: Vec<f64> = counts
        .tps
        .iter()
        .map(|&tp| if positives > 0.0 { tp / positives } else { 1.0 })
        .rev()
        .collect();
    precision.push(1.0);
    recall.push(0.0);

    let thresholds = counts.thresholds.into_iter().rev().collect();
    Ok(PrecisionRecallPoints {
        precision,
        recall,
        thresholds,
    })
}

/// Trapezoidal area under `(x, y)`, `x` monotone.
pub fn area_under(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) / 2.0)
        .sum()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RocCurve;

impl PerformanceSummary for RocCurve {
    fn name(&self) -> &'static str {
        "ROC Curve"
    }

    fn calculate(&self, score: &Score, truth: &[u8]) -> Result<serde_json::Value, SummaryError> {
        let points = roc_curve(truth, score.values())?;
        Ok(serde_json::json!({
            "fpr": points.fpr,
            "tpr": points.tpr,
            "thresholds": points.thresholds,
        }))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PrecisionRecallCurve;

impl PerformanceSummary for PrecisionRecallCurve {
    fn name(&self) -> &'static str {
        "Precision-Recall Curve"
    }

    fn calculate(&self, score: &Score, truth: &[u8]) -> Result<serde_json::Value, SummaryError> {
        let points = precision_recall_curve(truth, score.values())?;
        Ok(serde_json::json!({
            "precision": points.precision,
            "recall": points.recall,
            "thresholds": points.thresholds,
        }))
    }
}

pub fn register(registry: &mut SummaryRegistry) {
    registry.register("ROC Curve", || Box::new(RocCurve));
    registry.register("Precision-Recall Curve", || Box::new(PrecisionRecallCurve));
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRUTH: [u8; 4] = [0, 0, 1, 1];
    const SCORES: [f64; 4] = [0.1, 0.4, 0.35, 0.8];

    #[test]
    fn test_binary_clf_curve_groups_ties() {
        let counts = binary_clf_curve(&[1, 0, 1, 0], &[0.9, 0.9, 0.5, 0.1]).unwrap();
        assert_eq!(counts.thresholds, vec![0.9, 0.5, 0.1]);
        assert_eq!(counts.tps, vec![1.0, 2.0, 2.0]);
        assert_eq!(counts.fps, vec![1.0, 1.0, 2.0]);
    }

    #[test]
    fn test_free_functions_check_their_inputs() {
        let mismatch = SummaryError::LengthMismatch {
            scores: 4,
            truth: 3,
        };
        assert_eq!(binary_clf_curve(&TRUTH[..3], &SCORES), Err(mismatch.clone()));
        assert_eq!(roc_curve(&TRUTH[..3], &SCORES), Err(mismatch.clone()));
        assert_eq!(precision_recall_curve(&TRUTH[..3], &SCORES), Err(mismatch));
        assert_eq!(
            roc_curve(&[0, 2], &[0.1, 0.2]),
            Err(SummaryError::NonBinaryLabel { index: 1, value: 2 })
        );
        assert_eq!(roc_curve(&[], &[]), Err(SummaryError::Empty));
    }

    #[test]
    fn test_roc_curve_matches_reference_values() {
        let roc = roc_curve(&TRUTH, &SCORES).unwrap();
        assert_eq!(roc.fpr, vec![0.0, 0.0, 0.5, 0.5, 1.0]);
        assert_eq!(roc.tpr, vec![0.0, 0.5, 0.5, 1.0, 1.0]);
        assert!((roc.thresholds[0] - 1.8).abs() < 1e-12);
        assert_eq!(roc.thresholds[1..], [0.8, 0.4, 0.35, 0.1]);
    }

    #[test]
    fn test_roc_curve_drops_collinear_points() {
        let roc = roc_curve(&[1, 1, 1, 0], &[0.9, 0.8, 0.7, 0.1]).unwrap();
        assert_eq!(roc.fpr, vec![0.0, 0.0, 0.0, 1.0]);
        assert_eq!(roc.tpr, vec![0.0, 1.0 / 3.0, 1.0, 1.0]);
        assert_eq!(roc.thresholds[1..], [0.9, 0.7, 0.1]);
    }

    #[test]
    fn test_roc_curve_with_one_class_is_nan() {
        let roc = roc_curve(&[1, 1], &[0.2, 0.3]).unwrap();
        assert!(roc.fpr.iter().all(|v| v.is_nan()));
        assert_eq!(roc.tpr.last(), Some(&1.0));
    }

    #[test]
    fn test_precision_recall_matches_reference_values() {
        let pr = precision_recall_curve(&TRUTH, &SCORES).unwrap();
        let expected_precision = [0.5, 2.0 / 3.0, 0.5, 1.0, 1.0];
        for (got, want) in pr.precision.iter().zip(expected_precision) {
            assert!((got - want).abs() < 1e-12, "{got} != {want}");
        }
        assert_eq!(pr.recall, vec![1.0, 1.0, 0.5, 0.5, 0.0]);
        assert_eq!(pr.thresholds, vec![0.1, 0.35, 0.4, 0.8]);
    }

    #[test]
    fn test_area_under_perfect_and_random() {
        assert_eq!(area_under(&[0.0, 0.0, 1.0], &[0.0, 1.0, 1.0]), 1.0);
        assert_eq!(area_under(&[0.0, 1.0], &[0.0, 1.0]), 0.5);
    }

    #[test]
    fn test_empty_scores() {
        assert!(matches!(roc_curve(&[], &[]), Err(SummaryError::Empty)));
    }
}
