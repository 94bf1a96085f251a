use exobengal_autodiff::Variable;
use exobengal_core::{Tensor, TensorError, TensorResult};

const EPS: f64 = 1e-7;

/// Binary cross-entropy over sigmoid outputs.
///
/// L = −mean(y·ln(p + ε) + (1 − y)·ln(1 − p + ε))
///
/// `pred` and `target` must broadcast against each other; both are
/// `[batch, 1]` in the network trainer.
pub fn bce_loss(pred: &Variable, target: &Variable) -> TensorResult<Variable> {
    let log_pred = pred.add_scalar(EPS).ln();
    let term1 = target.mul(&log_pred)?;

    let one_minus_target = target.neg().add_scalar(1.0);
    let log_one_minus = pred.neg().add_scalar(1.0 + EPS).ln();
    let term2 = one_minus_target.mul(&log_one_minus)?;

    Ok(term1.add(&term2)?.neg().mean())
}

/// Graph-free binary cross-entropy, used for validation loss reporting.
pub fn binary_cross_entropy(pred: &Tensor<f64>, target: &Tensor<f64>) -> TensorResult<f64> {
    if pred.numel() != target.numel() {
        return Err(TensorError::DimensionMismatch(format!(
            "{} predictions for {} targets",
            pred.numel(),
            target.numel()
        )));
    }
    if pred.numel() == 0 {
        return Err(TensorError::EmptyTensor);
    }
    let total: f64 = pred
        .data()
        .iter()
        .zip(target.data())
        .map(|(&p, &y)| y * (p + EPS).ln() + (1.0 - y) * (1.0 - p + EPS).ln())
        .sum();
    Ok(-total / pred.numel() as f64)
}
