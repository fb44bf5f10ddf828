// ─────────────────────────────────────────────────────────────────────
// MagNet — Compressed Sparse Row Matrices
// ─────────────────────────────────────────────────────────────────────
//! Real-valued CSR matrices. Complex operators are carried as a pair of
//! these, so every kernel here is real-only.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use magnet_types::{MagNetError, MagNetResult};

/// Sparse real matrix in Compressed Sparse Row format.
///
/// Column indices are sorted within each row, duplicates are merged and
/// explicit zeros are dropped at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsrMatrix {
    pub n_rows: usize,
    pub n_cols: usize,
    /// Row i spans `col_idx[row_ptr[i]..row_ptr[i + 1]]`.
    pub row_ptr: Vec<usize>,
    pub col_idx: Vec<usize>,
    pub values: Vec<f64>,
}

impl CsrMatrix {
    /// All-zero `n_rows × n_cols` matrix.
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            row_ptr: vec![0; n_rows + 1],
            col_idx: Vec::new(),
            values: Vec::new(),
        }
    }

    /// `n × n` identity.
    pub fn identity(n: usize) -> Self {
        Self {
            n_rows: n,
            n_cols: n,
            row_ptr: (0..=n).collect(),
            col_idx: (0..n).collect(),
            values: vec![1.0; n],
        }
    }

    /// Build from `(row, col, value)` triplets. Sorts by (row, col), sums
    /// duplicates and drops entries that end up exactly zero.
    pub fn from_triplets(
        n_rows: usize,
        n_cols: usize,
        mut triplets: Vec<(usize, usize, f64)>,
    ) -> MagNetResult<Self> {
        if let Some(&(r, c, _)) = triplets.iter().find(|&&(r, c, _)| r >= n_rows || c >= n_cols) {
            return Err(MagNetError::Shape(format!(
                "triplet ({r}, {c}) outside {n_rows}×{n_cols}"
            )));
        }
        triplets.sort_unstable_by_key(|&(r, c, _)| (r, c));

        let mut merged: Vec<(usize, usize, f64)> = Vec::with_capacity(triplets.len());
        for (r, c, v) in triplets {
            match merged.last_mut() {
                Some(last) if last.0 == r && last.1 == c => last.2 += v,
                _ => merged.push((r, c, v)),
            }
        }

        let mut row_ptr = vec![0usize; n_rows + 1];
        let mut col_idx = Vec::with_capacity(merged.len());
        let mut values = Vec::with_capacity(merged.len());
        for (r, c, v) in merged {
            if v == 0.0 {
                continue;
            }
            row_ptr[r + 1] += 1;
            col_idx.push(c);
            values.push(v);
        }
        for i in 0..n_rows {
            row_ptr[i + 1] += row_ptr[i];
        }

        Ok(Self {
            n_rows,
            n_cols,
            row_ptr,
            col_idx,
            values,
        })
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    /// Iterate `(row, col, value)` over stored entries.
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.n_rows).flat_map(move |i| {
            (self.row_ptr[i]..self.row_ptr[i + 1]).map(move |p| (i, self.col_idx[p], self.values[p]))
        })
    }

    /// Entry lookup (binary search within the row).
    pub fn get(&self, row: usize, col: usize) -> f64 {
        if row >= self.n_rows {
            return 0.0;
        }
        let span = self.row_ptr[row]..self.row_ptr[row + 1];
        match self.col_idx[span.clone()].binary_search(&col) {
            Ok(p) => self.values[span.start + p],
            Err(_) => 0.0,
        }
    }

    pub fn transpose(&self) -> MagNetResult<Self> {
        let triplets = self.triplets().map(|(r, c, v)| (c, r, v)).collect();
        Self::from_triplets(self.n_cols, self.n_rows, triplets)
    }

    /// `scale · A + shift · I` for square `A`.
    pub fn scaled_shifted(&self, scale: f64, shift: f64) -> MagNetResult<Self> {
        if self.n_rows != self.n_cols {
            return Err(MagNetError::Shape(format!(
                "diagonal shift needs a square matrix, got {}×{}",
                self.n_rows, self.n_cols
            )));
        }
        let mut triplets: Vec<(usize, usize, f64)> =
            self.triplets().map(|(r, c, v)| (r, c, scale * v)).collect();
        if shift != 0.0 {
            triplets.extend((0..self.n_rows).map(|i| (i, i, shift)));
        }
        Self::from_triplets(self.n_rows, self.n_cols, triplets)
    }

    /// Sparse × dense product `A · X`.
    pub fn spmm(&self, x: ArrayView2<'_, f64>) -> MagNetResult<Array2<f64>> {
        let mut y = Array2::zeros((self.n_rows, x.ncols()));
        self.spmm_acc(x, 1.0, &mut y)?;
        Ok(y)
    }

    /// Accumulate `y += alpha · A · X`.
    pub fn spmm_acc(
        &self,
        x: ArrayView2<'_, f64>,
        alpha: f64,
        y: &mut Array2<f64>,
    ) -> MagNetResult<()> {
        if x.nrows() != self.n_cols || y.nrows() != self.n_rows || y.ncols() != x.ncols() {
            return Err(MagNetError::Shape(format!(
                "spmm: A is {}×{}, X is {}×{}, Y is {}×{}",
                self.n_rows,
                self.n_cols,
                x.nrows(),
                x.ncols(),
                y.nrows(),
                y.ncols()
            )));
        }
        for i in 0..self.n_rows {
            let mut y_row = y.row_mut(i);
            for p in self.row_ptr[i]..self.row_ptr[i + 1] {
                y_row.scaled_add(alpha * self.values[p], &x.row(self.col_idx[p]));
            }
        }
        Ok(())
    }

    /// Dense copy (tests and small-graph diagnostics only).
    pub fn to_dense(&self) -> Array2<f64> {
        let mut out = Array2::zeros((self.n_rows, self.n_cols));
        for (r, c, v) in self.triplets() {
            out[[r, c]] = v;
        }
        out
    }

    /// `max_ij |A_ij − sign · A_ji|`, i.e. distance from (skew-)symmetry.
    fn symmetry_defect(&self, sign: f64) -> f64 {
        self.triplets()
            .map(|(r, c, v)| (v - sign * self.get(c, r)).abs())
            .fold(0.0, f64::max)
    }

    pub fn is_symmetric(&self, tol: f64) -> bool {
        self.n_rows == self.n_cols && self.symmetry_defect(1.0) <= tol
    }

    pub fn is_skew_symmetric(&self, tol: f64) -> bool {
        self.n_rows == self.n_cols && self.symmetry_defect(-1.0) <= tol
    }

    /// Largest absolute row sum.
    pub fn max_abs_row_sum(&self) -> f64 {
        (0..self.n_rows)
            .map(|i| {
                self.values[self.row_ptr[i]..self.row_ptr[i + 1]]
                    .iter()
                    .map(|v| v.abs())
                    .sum::<f64>()
            })
            .fold(0.0, f64::max)
    }

    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_from_triplets_merges_and_sorts() {
        let m = CsrMatrix::from_triplets(
            3,
            3,
            vec![(2, 0, 1.0), (0, 2, 2.0), (0, 1, 1.0), (0, 2, 3.0)],
        )
        .unwrap();
        assert_eq!(m.nnz(), 3);
        assert_eq!(m.row_ptr, vec![0, 2, 2, 3]);
        assert_eq!(m.col_idx, vec![1, 2, 0]);
        assert!((m.get(0, 2) - 5.0).abs() < 1e-12);
        assert_eq!(m.get(1, 1), 0.0);
    }

    #[test]
    fn test_from_triplets_drops_cancelled_entries() {
        let m = CsrMatrix::from_triplets(2, 2, vec![(0, 1, 1.0), (0, 1, -1.0)]).unwrap();
        assert_eq!(m.nnz(), 0);
    }

    #[test]
    fn test_from_triplets_out_of_range() {
        assert!(CsrMatrix::from_triplets(2, 2, vec![(2, 0, 1.0)]).is_err());
    }

    #[test]
    fn test_spmm_matches_dense() {
        let m = CsrMatrix::from_triplets(
            3,
            3,
            vec![(0, 0, 2.0), (0, 2, -1.0), (1, 1, 3.0), (2, 0, 0.5)],
        )
        .unwrap();
        let x = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let y = m.spmm(x.view()).unwrap();
        let expected = m.to_dense().dot(&x);
        for (a, b) in y.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_spmm_shape_mismatch() {
        let m = CsrMatrix::identity(3);
        let x = Array2::<f64>::zeros((2, 2));
        assert!(m.spmm(x.view()).is_err());
    }

    #[test]
    fn test_scaled_shifted() {
        let m = CsrMatrix::from_triplets(2, 2, vec![(0, 0, 1.0), (0, 1, 2.0)]).unwrap();
        let s = m.scaled_shifted(2.0, -1.0).unwrap();
        assert!((s.get(0, 0) - 1.0).abs() < 1e-12);
        assert!((s.get(0, 1) - 4.0).abs() < 1e-12);
        assert!((s.get(1, 1) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_transpose_and_symmetry() {
        let m = CsrMatrix::from_triplets(2, 2, vec![(0, 1, 1.0), (1, 0, -1.0)]).unwrap();
        assert!(m.is_skew_symmetric(1e-12));
        assert!(!m.is_symmetric(1e-12));
        let t = m.transpose().unwrap();
        assert!((t.get(1, 0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_transpose_reports_corrupt_indices() {
        let m = CsrMatrix {
            n_rows: 2,
            n_cols: 2,
            row_ptr: vec![0, 1, 1],
            col_idx: vec![5],
            values: vec![1.0],
        };
        assert!(matches!(m.transpose(), Err(MagNetError::Shape(_))));
    }

    #[test]
    fn test_max_abs_row_sum() {
        let m = CsrMatrix::from_triplets(2, 2, vec![(0, 0, 1.0), (0, 1, -2.0), (1, 1, 0.5)])
            .unwrap();
        assert!((m.max_abs_row_sum() - 3.0).abs() < 1e-12);
    }
}
