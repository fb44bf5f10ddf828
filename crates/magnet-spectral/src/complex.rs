// ─────────────────────────────────────────────────────────────────────
// MagNet — Paired Real/Imaginary Feature Blocks
// ─────────────────────────────────────────────────────────────────────
//! Complex dense blocks stored as two real `N×F` arrays.
//!
//! Products are expanded by hand, `(a+ib)(c+id) = (ac−bd) + i(ad+bc)`,
//! so the sparse back-end only ever sees real kernels.

use ndarray::{concatenate, s, Array2, Axis};
use serde::{Deserialize, Serialize};

use magnet_types::{MagNetError, MagNetResult};

use crate::sparse::CsrMatrix;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexMatrix {
    pub re: Array2<f64>,
    pub im: Array2<f64>,
}

impl ComplexMatrix {
    pub fn new(re: Array2<f64>, im: Array2<f64>) -> MagNetResult<Self> {
        if re.dim() != im.dim() {
            return Err(MagNetError::Shape(format!(
                "real part is {:?}, imaginary part is {:?}",
                re.dim(),
                im.dim()
            )));
        }
        Ok(Self { re, im })
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            re: Array2::zeros((rows, cols)),
            im: Array2::zeros((rows, cols)),
        }
    }

    /// Initial signal for a real feature matrix: `X_re = X_im = X`.
    pub fn from_real_features(x: &Array2<f64>) -> Self {
        Self {
            re: x.clone(),
            im: x.clone(),
        }
    }

    pub fn nrows(&self) -> usize {
        self.re.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.re.ncols()
    }

    pub fn dim(&self) -> (usize, usize) {
        self.re.dim()
    }

    /// `self += alpha · other`.
    pub fn scaled_add(&mut self, alpha: f64, other: &ComplexMatrix) {
        self.re.scaled_add(alpha, &other.re);
        self.im.scaled_add(alpha, &other.im);
    }

    /// Dense complex product `self · W` with `W` given as real/imaginary parts.
    pub fn matmul(&self, w: &ComplexMatrix) -> ComplexMatrix {
        ComplexMatrix {
            re: self.re.dot(&w.re) - self.im.dot(&w.im),
            im: self.re.dot(&w.im) + self.im.dot(&w.re),
        }
    }

    /// Sparse complex operator applied to this block:
    /// `(A_re + i A_im)(X_re + i X_im)`.
    pub fn apply_sparse(
        &self,
        a_re: &CsrMatrix,
        a_im: &CsrMatrix,
    ) -> MagNetResult<ComplexMatrix> {
        let mut out = ComplexMatrix::zeros(a_re.n_rows, self.ncols());
        self.apply_sparse_acc(a_re, a_im, 1.0, &mut out)?;
        Ok(out)
    }

    /// `out += alpha · (A_re + i A_im)(X_re + i X_im)` as four real products.
    pub fn apply_sparse_acc(
        &self,
        a_re: &CsrMatrix,
        a_im: &CsrMatrix,
        alpha: f64,
        out: &mut ComplexMatrix,
    ) -> MagNetResult<()> {
        a_re.spmm_acc(self.re.view(), alpha, &mut out.re)?;
        a_im.spmm_acc(self.im.view(), -alpha, &mut out.re)?;
        a_im.spmm_acc(self.re.view(), alpha, &mut out.im)?;
        a_re.spmm_acc(self.im.view(), alpha, &mut out.im)?;
        Ok(())
    }

    /// Columns `[re | im]`, an `N × 2F` real block.
    pub fn concat_parts(&self) -> MagNetResult<Array2<f64>> {
        concatenate(Axis(1), &[self.re.view(), self.im.view()])
            .map_err(|e| MagNetError::Shape(format!("cannot concatenate parts: {e}")))
    }

    /// Inverse of [`concat_parts`](Self::concat_parts).
    pub fn split_parts(block: &Array2<f64>) -> MagNetResult<Self> {
        if block.ncols() % 2 != 0 {
            return Err(MagNetError::Shape(format!(
                "cannot split {} columns into real/imaginary halves",
                block.ncols()
            )));
        }
        let f = block.ncols() / 2;
        Ok(Self {
            re: block.slice(s![.., ..f]).to_owned(),
            im: block.slice(s![.., f..]).to_owned(),
        })
    }

    pub fn is_finite(&self) -> bool {
        self.re.iter().chain(self.im.iter()).all(|v| v.is_finite())
    }

    /// Largest absolute difference over both parts.
    pub fn max_abs_diff(&self, other: &ComplexMatrix) -> f64 {
        self.re
            .iter()
            .zip(other.re.iter())
            .chain(self.im.iter().zip(other.im.iter()))
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

impl std::ops::Sub for &ComplexMatrix {
    type Output = ComplexMatrix;

    fn sub(self, rhs: &ComplexMatrix) -> ComplexMatrix {
        ComplexMatrix {
            re: &self.re - &rhs.re,
            im: &self.im - &rhs.im,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_new_rejects_mismatched_parts() {
        let err = ComplexMatrix::new(Array2::zeros((2, 2)), Array2::zeros((2, 3)));
        assert!(err.is_err());
    }

    #[test]
    fn test_matmul_complex_identity() {
        // (1+2i)(3+4i) = -5 + 10i
        let x = ComplexMatrix::new(array![[1.0]], array![[2.0]]).unwrap();
        let w = ComplexMatrix::new(array![[3.0]], array![[4.0]]).unwrap();
        let y = x.matmul(&w);
        assert!((y.re[[0, 0]] + 5.0).abs() < 1e-12);
        assert!((y.im[[0, 0]] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_apply_sparse_cross_terms() {
        // A = [[0, i], [-i, 0]] (Hermitian), x = [1 + i, 2]
        let a_re = CsrMatrix::zeros(2, 2);
        let a_im = CsrMatrix::from_triplets(2, 2, vec![(0, 1, 1.0), (1, 0, -1.0)]).unwrap();
        let x = ComplexMatrix::new(array![[1.0], [2.0]], array![[1.0], [0.0]]).unwrap();
        let y = x.apply_sparse(&a_re, &a_im).unwrap();
        // row 0: i·2 = 2i ; row 1: -i(1+i) = 1 - i
        assert!((y.re[[0, 0]] - 0.0).abs() < 1e-12);
        assert!((y.im[[0, 0]] - 2.0).abs() < 1e-12);
        assert!((y.re[[1, 0]] - 1.0).abs() < 1e-12);
        assert!((y.im[[1, 0]] + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_concat_split_parts() {
        let x = ComplexMatrix::new(array![[1.0, 2.0]], array![[3.0, 4.0]]).unwrap();
        let cat = x.concat_parts().unwrap();
        assert_eq!(cat, array![[1.0, 2.0, 3.0, 4.0]]);
        assert_eq!(ComplexMatrix::split_parts(&cat).unwrap(), x);
    }

    #[test]
    fn test_concat_rejects_mismatched_public_parts() {
        // Fields are public, so a caller can break the shared-shape invariant.
        let x = ComplexMatrix {
            re: Array2::zeros((2, 1)),
            im: Array2::zeros((3, 1)),
        };
        assert!(matches!(x.concat_parts(), Err(MagNetError::Shape(_))));
    }
}
