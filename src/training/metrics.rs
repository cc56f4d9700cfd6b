//! Evaluation metrics for binary classifiers

use crate::error::{FraudError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Precision-recall pairs per decision threshold.
///
/// `thresholds` is increasing; `precision` and `recall` hold one more
/// entry than `thresholds`, ending with `(1.0, 0.0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecisionRecallCurve {
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
    pub thresholds: Vec<f64>,
}

/// Cumulative false and true positives at each distinct score, scores descending
fn binary_clf_curve(y_true: &Array1<f64>, scores: &Array1<f64>) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>)> {
    if y_true.len() != scores.len() {
        return Err(FraudError::length_mismatch("scores", y_true.len(), scores.len()));
    }
    if y_true.is_empty() {
        return Err(FraudError::Validation("cannot score an empty sample".to_string()));
    }

    if let Some(i) = scores.iter().position(|s| s.is_nan()) {
        return Err(FraudError::Validation(format!("score at row {} is NaN", i)));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut fps = Vec::new();
    let mut tps = Vec::new();
    let mut thresholds = Vec::new();
    let mut tp = 0.0;
    let mut fp = 0.0;
    for (k, &i) in order.iter().enumerate() {
        if y_true[i] == 1.0 {
            tp += 1.0;
        } else {
            fp += 1.0;
        }
        let last_of_value = k + 1 == order.len() || scores[order[k + 1]] != scores[i];
        if last_of_value {
            tps.push(tp);
            fps.push(fp);
            thresholds.push(scores[i]);
        }
    }
    Ok((fps, tps, thresholds))
}

/// Precision and recall for every distinct score used as threshold
pub fn precision_recall_curve(y_true: &Array1<f64>, scores: &Array1<f64>) -> Result<PrecisionRecallCurve> {
    let (fps, tps, thresholds) = binary_clf_curve(y_true, scores)?;
    let total_positive = tps.last().copied().unwrap_or(0.0);

    let mut precision: Vec<f64> = tps
        .iter()
        .zip(fps.iter())
        .rev()
        .map(|(&tp, &fp)| if tp + fp > 0.0 { tp / (tp + fp) } else { 0.0 })
        .collect();
    let mut recall: Vec<f64> = tps
        .iter()
        .rev()
        .map(|&tp| if total_positive > 0.0 { tp / total_positive } else { 1.0 })
        .collect();
    precision.push(1.0);
    recall.push(0.0);

    Ok(PrecisionRecallCurve {
        precision,
        recall,
        thresholds: thresholds.into_iter().rev().collect(),
    })
}

/// Area under the precision-recall step curve: `sum((R_n - R_{n-1}) * P_n)`
pub fn average_precision(y_true: &Array1<f64>, scores: &Array1<f64>) -> Result<f64> {
    let curve = precision_recall_curve(y_true, scores)?;
    Ok(curve.average_precision())
}

impl PrecisionRecallCurve {
    /// Step-wise area under this curve
    pub fn average_precision(&self) -> f64 {
        self.recall
            .windows(2)
            .zip(self.precision.iter())
            .map(|(r, &p)| (r[0] - r[1]) * p)
            .sum()
    }

    pub fn len(&self) -> usize {
        self.precision.len()
    }

    pub fn is_empty(&self) -> bool {
        self.precision.is_empty()
    }
}

/// Threshold metrics from hard predictions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl ClassificationMetrics {
    /// Compute metrics treating label `1` as positive. Undefined ratios are `0`.
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(FraudError::length_mismatch("predictions", y_true.len(), y_pred.len()));
        }

        let (tp, fp, tn, fn_) = Self::confusion_counts(y_true, y_pred);
        let ratio = |num: usize, den: usize| if den > 0 { num as f64 / den as f64 } else { 0.0 };

        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Ok(Self {
            accuracy: ratio(tp + tn, y_true.len()),
            precision,
            recall,
            f1_score,
            true_positives: tp,
            false_positives: fp,
            true_negatives: tn,
            false_negatives: fn_,
        })
    }

    fn confusion_counts(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> (usize, usize, usize, usize) {
        let mut counts = (0, 0, 0, 0);
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t == 1.0, p == 1.0) {
                (true, true) => counts.0 += 1,
                (false, true) => counts.1 += 1,
                (false, false) => counts.2 += 1,
                (true, false) => counts.3 += 1,
            }
        }
        counts
    }
}
