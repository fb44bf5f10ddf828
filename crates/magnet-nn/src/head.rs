// ─────────────────────────────────────────────────────────────────────
// MagNet — Classifier Head
// ─────────────────────────────────────────────────────────────────────
//! `[Y_re | Y_im]` → dropout → linear → row-wise log-softmax.
//!
//! Output orientation is `(N, classes)`, matching the label vector.

use ndarray::{Array2, Axis};
use rand::Rng;

use magnet_types::{MagNetError, MagNetResult};

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierHead {
    /// `2F × classes`.
    pub weight: Array2<f64>,
    /// `1 × classes`.
    pub bias: Array2<f64>,
}

impl ClassifierHead {
    /// Weight and bias uniform in `±1/sqrt(in_features)`.
    pub fn new<R: Rng>(in_features: usize, classes: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (in_features as f64).sqrt();
        let weight =
            Array2::from_shape_fn((in_features, classes), |_| rng.gen_range(-bound..=bound));
        let bias = Array2::from_shape_fn((1, classes), |_| rng.gen_range(-bound..=bound));
        Self { weight, bias }
    }

    pub fn in_features(&self) -> usize {
        self.weight.nrows()
    }

    pub fn classes(&self) -> usize {
        self.weight.ncols()
    }

    /// Raw logits, `N × classes`.
    pub fn logits(&self, input: &Array2<f64>) -> MagNetResult<Array2<f64>> {
        if input.ncols() != self.in_features() {
            return Err(MagNetError::Shape(format!(
                "head expects {} input columns, got {}",
                self.in_features(),
                input.ncols()
            )));
        }
        Ok(input.dot(&self.weight) + &self.bias)
    }

    /// Log-probabilities, `N × classes`.
    pub fn classify(&self, input: &Array2<f64>) -> MagNetResult<Array2<f64>> {
        Ok(log_softmax(&self.logits(input)?))
    }

    /// Given `∂loss/∂logits`, returns `(∂W, ∂b, ∂input)`.
    pub fn backward(
        &self,
        input: &Array2<f64>,
        grad_logits: &Array2<f64>,
    ) -> (Array2<f64>, Array2<f64>, Array2<f64>) {
        let grad_w = input.t().dot(grad_logits);
        let grad_b = grad_logits.sum_axis(Axis(0)).insert_axis(Axis(0));
        let grad_in = grad_logits.dot(&self.weight.t());
        (grad_w, grad_b, grad_in)
    }
}

/// Numerically stable row-wise log-softmax.
pub fn log_softmax(logits: &Array2<f64>) -> Array2<f64> {
    let mut out = logits.clone();
    for mut row in out.rows_mut() {
        let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        let lse = max + row.iter().map(|&v| (v - max).exp()).sum::<f64>().ln();
        row.mapv_inplace(|v| v - lse);
    }
    out
}

/// Inverted-dropout mask: entries are `0` with probability `p`, else `1/(1−p)`.
pub fn dropout_mask<R: Rng>(rows: usize, cols: usize, p: f64, rng: &mut R) -> Array2<f64> {
    if p <= 0.0 {
        return Array2::ones((rows, cols));
    }
    let keep = 1.0 / (1.0 - p);
    Array2::from_shape_fn((rows, cols), |_| {
        if rng.gen::<f64>() < p {
            0.0
        } else {
            keep
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_rows_are_log_probabilities() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let head = ClassifierHead::new(6, 4, &mut rng);
        let x = Array2::from_shape_fn((5, 6), |(i, j)| (i as f64 - 2.0) * (j as f64 + 1.0));
        let lp = head.classify(&x).unwrap();
        assert_eq!(lp.dim(), (5, 4));
        for row in lp.rows() {
            let s: f64 = row.iter().map(|v| v.exp()).sum();
            assert!((s - 1.0).abs() < 1e-12, "row sums to {s}");
            assert!(row.iter().all(|&v| v <= 0.0));
        }
    }

    #[test]
    fn test_log_softmax_large_logits() {
        let lp = log_softmax(&array![[1000.0, 1000.0], [-1000.0, 0.0]]);
        assert!((lp[[0, 0]] - (0.5f64).ln()).abs() < 1e-12);
        assert!(lp[[1, 1]].abs() < 1e-12);
        assert!(lp.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_dropout_mask_scaling() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let m = dropout_mask(200, 10, 0.5, &mut rng);
        assert!(m.iter().all(|&v| v == 0.0 || (v - 2.0).abs() < 1e-12));
        let kept = m.iter().filter(|&&v| v > 0.0).count() as f64 / 2000.0;
        assert!((kept - 0.5).abs() < 0.05, "kept fraction {kept}");
        assert!(dropout_mask(3, 3, 0.0, &mut rng).iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_shape_mismatch() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let head = ClassifierHead::new(4, 2, &mut rng);
        assert!(head.classify(&Array2::zeros((3, 5))).is_err());
    }
}
