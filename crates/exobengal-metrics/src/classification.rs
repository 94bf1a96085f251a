use std::fmt;

use exobengal_core::{TensorError, TensorResult};
use serde::{Deserialize, Serialize};

fn check_lengths(y_true: &[f64], y_pred: &[f64]) -> TensorResult<()> {
    if y_true.len() != y_pred.len() {
        return Err(TensorError::DimensionMismatch(format!(
            "{} labels but {} predictions",
            y_true.len(),
            y_pred.len()
        )));
    }
    if y_true.is_empty() {
        return Err(TensorError::EmptyTensor);
    }
    Ok(())
}

fn class_of(v: f64) -> usize {
    v.round().max(0.0) as usize
}

/// Fraction of exact label matches.
pub fn accuracy(y_true: &[f64], y_pred: &[f64]) -> TensorResult<f64> {
    check_lengths(y_true, y_pred)?;
    let correct = y_true
        .iter()
        .zip(y_pred)
        .filter(|&(&t, &p)| class_of(t) == class_of(p))
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// `matrix[true][predicted]` counts; labels outside `0..n_classes` are ignored.
pub fn confusion_matrix(
    y_true: &[f64],
    y_pred: &[f64],
    n_classes: usize,
) -> TensorResult<Vec<Vec<usize>>> {
    check_lengths(y_true, y_pred)?;
    let mut matrix = vec![vec![0usize; n_classes]; n_classes];
    for (&t, &p) in y_true.iter().zip(y_pred) {
        let (ti, pi) = (class_of(t), class_of(p));
        if ti < n_classes && pi < n_classes {
            matrix[ti][pi] += 1;
        }
    }
    Ok(matrix)
}

/// Precision, recall and F1 of one class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

impl ClassScores {
    fn from_counts(tp: usize, fp: usize, fn_: usize) -> Self {
        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        ClassScores {
            precision,
            recall,
            f1,
            support: tp + fn_,
        }
    }
}

/// Per-class scores plus accuracy, macro and support-weighted averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub class_names: Vec<String>,
    pub per_class: Vec<ClassScores>,
    pub accuracy: f64,
    pub macro_avg: ClassScores,
    pub weighted_avg: ClassScores,
}

impl ClassificationReport {
    /// Build from true and predicted class indices; `class_names[c]` labels class `c`.
    pub fn new(y_true: &[f64], y_pred: &[f64], class_names: &[&str]) -> TensorResult<Self> {
        let n_classes = class_names.len();
        let cm = confusion_matrix(y_true, y_pred, n_classes)?;

        let per_class: Vec<ClassScores> = (0..n_classes)
            .map(|c| {
                let tp = cm[c][c];
                let fp = (0..n_classes).map(|r| cm[r][c]).sum::<usize>() - tp;
                let fn_ = cm[c].iter().sum::<usize>() - tp;
                ClassScores::from_counts(tp, fp, fn_)
            })
            .collect();

        let total: usize = per_class.iter().map(|s| s.support).sum();
        let average = |weight: &dyn Fn(&ClassScores) -> f64, norm: f64| ClassScores {
            precision: per_class.iter().map(|s| s.precision * weight(s)).sum::<f64>() / norm,
            recall: per_class.iter().map(|s| s.recall * weight(s)).sum::<f64>() / norm,
            f1: per_class.iter().map(|s| s.f1 * weight(s)).sum::<f64>() / norm,
            support: total,
        };
        let macro_avg = average(&|_| 1.0, n_classes.max(1) as f64);
        let weighted_avg = average(&|s| s.support as f64, total.max(1) as f64);

        Ok(ClassificationReport {
            class_names: class_names.iter().map(|s| s.to_string()).collect(),
            per_class,
            accuracy: accuracy(y_true, y_pred)?,
            macro_avg,
            weighted_avg,
        })
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .class_names
            .iter()
            .map(String::len)
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or(12);
        let row = |f: &mut fmt::Formatter<'_>, name: &str, s: &ClassScores| {
            writeln!(
                f,
                "{name:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                s.precision, s.recall, s.f1, s.support
            )
        };

        writeln!(f, "{:>width$} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for (name, scores) in self.class_names.iter().zip(&self.per_class) {
            row(f, name, scores)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        row(f, "macro avg", &self.macro_avg)?;
        row(f, "weighted avg", &self.weighted_avg)
    }
}

/// Area under the ROC curve for 0/1 labels and continuous scores.
///
/// Tied scores form a single threshold step, so a constant scorer gets 0.5.
/// Returns 0.5 when only one class is present.
pub fn roc_auc(y_true: &[f64], y_scores: &[f64]) -> TensorResult<f64> {
    check_lengths(y_true, y_scores)?;
    let mut pairs: Vec<(f64, bool)> = y_scores
        .iter()
        .zip(y_true)
        .map(|(&s, &t)| (s, class_of(t) == 1))
        .collect();
    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

    let total_pos = pairs.iter().filter(|(_, positive)| *positive).count() as f64;
    let total_neg = pairs.len() as f64 - total_pos;
    if total_pos == 0.0 || total_neg == 0.0 {
        return Ok(0.5);
    }

    let mut auc = 0.0;
    let (mut tp, mut fp) = (0.0, 0.0);
    let (mut prev_tpr, mut prev_fpr) = (0.0, 0.0);
    let mut i = 0;
    while i < pairs.len() {
        let score = pairs[i].0;
        while i < pairs.len() && pairs[i].0 == score {
            if pairs[i].1 {
                tp += 1.0;
            } else {
                fp += 1.0;
            }
            i += 1;
        }
        let tpr = tp / total_pos;
        let fpr = fp / total_neg;
        auc += (fpr - prev_fpr) * (tpr + prev_tpr) / 2.0;
        prev_tpr = tpr;
        prev_fpr = fpr;
    }
    Ok(auc)
}
