// ─────────────────────────────────────────────────────────────────────
// MagNet — Chebyshev Sparse Propagator
// ─────────────────────────────────────────────────────────────────────
//! Chebyshev recursion on a complex signal:
//!
//!   T_0 = X
//!   T_1 = L̃ X
//!   T_k = 2 L̃ T_{k−1} − T_{k−2}
//!
//! with `L̃ = 2L/λ_max − I` kept as a sparse real/imaginary pair. Every
//! `L̃ ·` is four real sparse × dense products; the operators are never
//! densified.
//!
//! `L̃` is Hermitian and each `T_k(L̃)` is a real polynomial in it, so the
//! adjoint of the whole family is again a Chebyshev sum. The reverse pass
//! evaluates `Σ_k T_k(L̃) G_k` with Clenshaw's recurrence.

use magnet_types::{MagNetError, MagNetResult};

use crate::complex::ComplexMatrix;
use crate::laplacian::MagneticLaplacian;
use crate::sparse::CsrMatrix;

/// Rescaled operator `L̃ = 2L/λ_max − I`.
#[derive(Debug, Clone)]
pub struct RescaledLaplacian {
    pub real: CsrMatrix,
    pub imag: CsrMatrix,
    lambda_max: f64,
}

impl RescaledLaplacian {
    pub fn new(lap: &MagneticLaplacian, lambda_max: f64) -> MagNetResult<Self> {
        if !lambda_max.is_finite() || lambda_max <= 0.0 {
            return Err(MagNetError::Numerical(format!(
                "cannot rescale by λ_max = {lambda_max}"
            )));
        }
        let scale = 2.0 / lambda_max;
        let real = lap.real.scaled_shifted(scale, -1.0)?;
        let imag = lap.imag.scaled_shifted(scale, 0.0)?;
        if !real.is_finite() || !imag.is_finite() {
            return Err(MagNetError::Numerical(
                "rescaled Laplacian contains non-finite entries".to_string(),
            ));
        }
        Ok(Self {
            real,
            imag,
            lambda_max,
        })
    }

    /// Wrap parts that are already rescaled.
    pub fn from_parts(real: CsrMatrix, imag: CsrMatrix) -> MagNetResult<Self> {
        if real.shape() != imag.shape() || real.n_rows != real.n_cols {
            return Err(MagNetError::Shape(format!(
                "operator parts are {:?} and {:?}",
                real.shape(),
                imag.shape()
            )));
        }
        Ok(Self {
            real,
            imag,
            lambda_max: 2.0,
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.real.n_rows
    }

    pub fn lambda_max(&self) -> f64 {
        self.lambda_max
    }

    /// `L̃ · X`.
    pub fn apply(&self, x: &ComplexMatrix) -> MagNetResult<ComplexMatrix> {
        x.apply_sparse(&self.real, &self.imag)
    }
}

/// Degree-K Chebyshev filter bank over a fixed rescaled Laplacian.
#[derive(Debug, Clone)]
pub struct ChebyshevPropagator {
    op: RescaledLaplacian,
    k: usize,
}

impl ChebyshevPropagator {
    pub fn new(op: RescaledLaplacian, k: usize) -> Self {
        Self { op, k }
    }

    pub fn order(&self) -> usize {
        self.k
    }

    pub fn num_nodes(&self) -> usize {
        self.op.num_nodes()
    }

    pub fn operator(&self) -> &RescaledLaplacian {
        &self.op
    }

    /// `[T_0 X, …, T_K X]`.
    pub fn propagate(&self, x: &ComplexMatrix) -> MagNetResult<Vec<ComplexMatrix>> {
        if x.nrows() != self.num_nodes() {
            return Err(MagNetError::Shape(format!(
                "signal has {} rows, operator has {} nodes",
                x.nrows(),
                self.num_nodes()
            )));
        }
        let mut terms = Vec::with_capacity(self.k + 1);
        terms.push(x.clone());
        if self.k == 0 {
            return Ok(terms);
        }
        terms.push(self.op.apply(x)?);

        for k in 2..=self.k {
            // T_k = 2 L̃ T_{k−1} − T_{k−2}
            let mut next = &ComplexMatrix::zeros(x.nrows(), x.ncols()) - &terms[k - 2];
            terms[k - 1].apply_sparse_acc(&self.op.real, &self.op.imag, 2.0, &mut next)?;
            if !next.is_finite() {
                return Err(MagNetError::Numerical(format!(
                    "Chebyshev term T_{k} is not finite (λ_max = {})",
                    self.op.lambda_max()
                )));
            }
            terms.push(next);
        }
        Ok(terms)
    }

    /// Adjoint of [`propagate`](Self::propagate): `Σ_k T_k(L̃) G_k`.
    ///
    /// Clenshaw: `b_k = G_k + 2 L̃ b_{k+1} − b_{k+2}` for k = K..1,
    /// result `G_0 + L̃ b_1 − b_2`.
    pub fn adjoint(&self, grads: &[ComplexMatrix]) -> MagNetResult<ComplexMatrix> {
        if grads.len() != self.k + 1 {
            return Err(MagNetError::Shape(format!(
                "expected {} gradient terms, got {}",
                self.k + 1,
                grads.len()
            )));
        }
        let (rows, cols) = grads[0].dim();
        let mut b1 = ComplexMatrix::zeros(rows, cols); // b_{k+1}
        let mut b2 = ComplexMatrix::zeros(rows, cols); // b_{k+2}

        for k in (1..=self.k).rev() {
            let mut bk = &grads[k] - &b2;
            b1.apply_sparse_acc(&self.op.real, &self.op.imag, 2.0, &mut bk)?;
            b2 = std::mem::replace(&mut b1, bk);
        }

        let mut out = &grads[0] - &b2;
        b1.apply_sparse_acc(&self.op.real, &self.op.imag, 1.0, &mut out)?;
        Ok(out)
    }
}

/// Propagate `(X_real, X_imag)` through `K` Chebyshev terms of the
/// already-rescaled operator `(L̃_real, L̃_imag)`.
pub fn propagate(
    l_real: &CsrMatrix,
    l_imag: &CsrMatrix,
    x: &ComplexMatrix,
    k: usize,
) -> MagNetResult<Vec<ComplexMatrix>> {
    let op = RescaledLaplacian::from_parts(l_real.clone(), l_imag.clone())?;
    ChebyshevPropagator::new(op, k).propagate(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DirectedGraph;
    use crate::laplacian::build;
    use crate::spectral::estimate_lambda_max;
    use ndarray::Array2;

    fn signal(n: usize, f: usize) -> ComplexMatrix {
        let re = Array2::from_shape_fn((n, f), |(i, j)| ((i * 7 + j * 3) as f64 * 0.37).sin());
        let im = Array2::from_shape_fn((n, f), |(i, j)| ((i * 5 + j) as f64 * 0.91).cos());
        ComplexMatrix::new(re, im).unwrap()
    }

    fn propagator(k: usize) -> ChebyshevPropagator {
        let g = DirectedGraph::new(
            6,
            vec![
                (0, 1, 1.0),
                (1, 2, 1.0),
                (2, 3, 2.0),
                (3, 0, 1.0),
                (4, 5, 1.0),
                (5, 1, 0.5),
                (2, 4, 1.0),
            ],
        )
        .unwrap();
        let lap = build(&g, 0.2).unwrap();
        let lam = estimate_lambda_max(&lap).unwrap();
        ChebyshevPropagator::new(RescaledLaplacian::new(&lap, lam).unwrap(), k)
    }

    fn frobenius_inner(a: &ComplexMatrix, b: &ComplexMatrix) -> f64 {
        (&a.re * &b.re).sum() + (&a.im * &b.im).sum()
    }

    #[test]
    fn test_k_zero_returns_input() {
        let p = propagator(0);
        let x = signal(6, 3);
        let terms = p.propagate(&x).unwrap();
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0], x);
    }

    #[test]
    fn test_k_one_is_single_hop() {
        let p = propagator(1);
        let x = signal(6, 2);
        let terms = p.propagate(&x).unwrap();
        let expected = p.operator().apply(&x).unwrap();
        assert!(terms[1].max_abs_diff(&expected) < 1e-12);
    }

    #[test]
    fn test_recursion_identity() {
        let p = propagator(4);
        let x = signal(6, 3);
        let t = p.propagate(&x).unwrap();
        for k in 2..=4 {
            let lt = p.operator().apply(&t[k - 1]).unwrap();
            let mut expected = &ComplexMatrix::zeros(6, 3) - &t[k - 2];
            expected.scaled_add(2.0, &lt);
            assert!(
                t[k].max_abs_diff(&expected) < 1e-12,
                "T_{k} violates the recursion"
            );
        }
    }

    #[test]
    fn test_spectrum_stays_bounded() {
        // With λ_max rescaling the spectrum of L̃ sits in [−1, 1], so no term
        // can grow beyond the input norm.
        let p = propagator(10);
        let x = signal(6, 1);
        let x_norm = frobenius_inner(&x, &x).sqrt();
        for t in p.propagate(&x).unwrap() {
            assert!(frobenius_inner(&t, &t).sqrt() <= x_norm * (1.0 + 1e-8));
        }
    }

    #[test]
    fn test_adjoint_identity() {
        // ⟨G, P X⟩ = ⟨Pᵀ G, X⟩ summed over all orders
        let k = 3;
        let p = propagator(k);
        let x = signal(6, 2);
        let grads: Vec<ComplexMatrix> = (0..=k)
            .map(|i| {
                let mut g = signal(6, 2);
                g.re.mapv_inplace(|v| v * (i as f64 + 1.0));
                g.im.mapv_inplace(|v| v - 0.3 * i as f64);
                g
            })
            .collect();
        let terms = p.propagate(&x).unwrap();
        let lhs: f64 = terms
            .iter()
            .zip(&grads)
            .map(|(t, g)| frobenius_inner(t, g))
            .sum();
        let rhs = frobenius_inner(&p.adjoint(&grads).unwrap(), &x);
        assert!((lhs - rhs).abs() < 1e-9 * lhs.abs().max(1.0), "{lhs} vs {rhs}");
    }

    #[test]
    fn test_adjoint_k_zero_is_identity() {
        let p = propagator(0);
        let g = signal(6, 2);
        assert_eq!(p.adjoint(std::slice::from_ref(&g)).unwrap(), g);
    }

    #[test]
    fn test_rescale_rejects_bad_lambda() {
        let lap = build(&DirectedGraph::cycle(3).unwrap(), 0.1).unwrap();
        assert!(RescaledLaplacian::new(&lap, 0.0).is_err());
        assert!(RescaledLaplacian::new(&lap, f64::NAN).is_err());
    }

    #[test]
    fn test_free_function_matches_propagator() {
        let p = propagator(2);
        let x = signal(6, 2);
        let op = p.operator();
        let a = propagate(&op.real, &op.imag, &x, 2).unwrap();
        let b = p.propagate(&x).unwrap();
        for (u, v) in a.iter().zip(&b) {
            assert!(u.max_abs_diff(v) < 1e-12);
        }
    }

    #[test]
    fn test_shape_mismatch() {
        let p = propagator(1);
        assert!(p.propagate(&signal(5, 1)).is_err());
    }
}
