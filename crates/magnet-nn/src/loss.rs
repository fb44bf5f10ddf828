// ─────────────────────────────────────────────────────────────────────
// MagNet — Masked Loss and Accuracy
// ─────────────────────────────────────────────────────────────────────
//! Negative log-likelihood and accuracy restricted to a node subset.
//!
//! Masks are node index lists; the forward pass always covers every node.

use ndarray::Array2;

use magnet_types::{MagNetError, MagNetResult};

fn check(log_probs: &Array2<f64>, labels: &[usize], idx: &[usize]) -> MagNetResult<()> {
    if labels.len() != log_probs.nrows() {
        return Err(MagNetError::Shape(format!(
            "{} labels for {} rows",
            labels.len(),
            log_probs.nrows()
        )));
    }
    if idx.is_empty() {
        return Err(MagNetError::Dataset("loss mask is empty".to_string()));
    }
    for &i in idx {
        if i >= labels.len() {
            return Err(MagNetError::Shape(format!("mask index {i} out of range")));
        }
        if labels[i] >= log_probs.ncols() {
            return Err(MagNetError::Shape(format!(
                "label {} of node {i} exceeds {} classes",
                labels[i],
                log_probs.ncols()
            )));
        }
    }
    Ok(())
}

/// `−mean_{i ∈ idx} log p(y_i | i)`.
pub fn nll_loss(log_probs: &Array2<f64>, labels: &[usize], idx: &[usize]) -> MagNetResult<f64> {
    check(log_probs, labels, idx)?;
    let total: f64 = idx.iter().map(|&i| log_probs[[i, labels[i]]]).sum();
    Ok(-total / idx.len() as f64)
}

/// Gradient of [`nll_loss`] w.r.t. the logits feeding the log-softmax:
/// `(softmax − onehot) / |idx|` on masked rows, zero elsewhere.
pub fn nll_logits_grad(
    log_probs: &Array2<f64>,
    labels: &[usize],
    idx: &[usize],
) -> MagNetResult<Array2<f64>> {
    check(log_probs, labels, idx)?;
    let scale = 1.0 / idx.len() as f64;
    let mut grad = Array2::zeros(log_probs.dim());
    for &i in idx {
        let mut row = grad.row_mut(i);
        row.assign(&log_probs.row(i).mapv(|v| v.exp() * scale));
        row[labels[i]] -= scale;
    }
    Ok(grad)
}

/// Predicted class per node (first maximum on ties).
pub fn argmax_rows(log_probs: &Array2<f64>) -> Vec<usize> {
    log_probs
        .rows()
        .into_iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (j, &v)| {
                    if v > best.1 {
                        (j, v)
                    } else {
                        best
                    }
                })
                .0
        })
        .collect()
}

/// Fraction of `idx` whose prediction matches the label; `0.0` for an empty mask.
pub fn accuracy(preds: &[usize], labels: &[usize], idx: &[usize]) -> f64 {
    if idx.is_empty() {
        return 0.0;
    }
    let correct = idx.iter().filter(|&&i| preds[i] == labels[i]).count();
    correct as f64 / idx.len() as f64
}
