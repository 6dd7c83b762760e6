//! Classification metrics

use serde::{Deserialize, Serialize};
use std::fmt;

/// Precision, recall and F1 of one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Averaged precision, recall and F1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Evaluation of a model on a labeled dataset.
///
/// The top-level precision/recall/F1 are support-weighted averages over classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub classes: Vec<ClassMetrics>,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
    pub n_samples: usize,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    }
}

impl EvaluationReport {
    /// Compute metrics from class indices into `class_names`.
    ///
    /// Only classes that occur in `y_true` or `y_pred` get a row. Any ratio
    /// with a zero denominator is 0.
    pub fn compute(y_true: &[usize], y_pred: &[usize], class_names: &[String]) -> Self {
        let n_samples = y_true.len();
        let n_classes = y_true
            .iter()
            .chain(y_pred)
            .map(|&c| c + 1)
            .max()
            .unwrap_or(0)
            .max(class_names.len());

        let mut true_positives = vec![0usize; n_classes];
        let mut predicted = vec![0usize; n_classes];
        let mut support = vec![0usize; n_classes];
        for (&t, &p) in y_true.iter().zip(y_pred) {
            support[t] += 1;
            predicted[p] += 1;
            if t == p {
                true_positives[t] += 1;
            }
        }

        let correct: usize = true_positives.iter().sum();
        let classes: Vec<ClassMetrics> = (0..n_classes)
            .filter(|&c| support[c] > 0 || predicted[c] > 0)
            .map(|c| {
                let precision = ratio(true_positives[c], predicted[c]);
                let recall = ratio(true_positives[c], support[c]);
                ClassMetrics {
                    label: class_names.get(c).cloned().unwrap_or_else(|| format!("class {}", c)),
                    precision,
                    recall,
                    f1_score: f1(precision, recall),
                    support: support[c],
                }
            })
            .collect();

        let macro_avg = Self::average(&classes, n_samples, |_| 1.0);
        let weighted_avg = Self::average(&classes, n_samples, |c| c.support as f64);

        Self {
            accuracy: ratio(correct, n_samples),
            precision: weighted_avg.precision,
            recall: weighted_avg.recall,
            f1_score: weighted_avg.f1_score,
            classes,
            macro_avg,
            weighted_avg,
            n_samples,
        }
    }

    fn average(classes: &[ClassMetrics], support: usize, weight: impl Fn(&ClassMetrics) -> f64) -> AverageMetrics {
        let total: f64 = classes.iter().map(&weight).sum();
        let mean = |value: fn(&ClassMetrics) -> f64| {
            if total > 0.0 {
                classes.iter().map(|c| value(c) * weight(c)).sum::<f64>() / total
            } else {
                0.0
            }
        };
        AverageMetrics {
            precision: mean(|c| c.precision),
            recall: mean(|c| c.recall),
            f1_score: mean(|c| c.f1_score),
            support,
        }
    }
}

impl fmt::Display for EvaluationReport {
    /// Tabular report in the familiar precision/recall/f1-score/support layout
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const LAST_LINE: &str = "weighted avg";
        let width = self
            .classes
            .iter()
            .map(|c| c.label.len())
            .max()
            .unwrap_or(0)
            .max(LAST_LINE.len());

        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for class in &self.classes {
            writeln!(
                f,
                "{:>width$}  {:>9.2} {:>9.2} {:>9.2} {:>9}",
                class.label, class.precision, class.recall, class.f1_score, class.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.n_samples
        )?;
        for (name, avg) in [("macro avg", &self.macro_avg), (LAST_LINE, &self.weighted_avg)] {
            writeln!(
                f,
                "{:>width$}  {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, avg.precision, avg.recall, avg.f1_score, avg.support
            )?;
        }
        Ok(())
    }
}
