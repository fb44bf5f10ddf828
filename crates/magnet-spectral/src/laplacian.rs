// ─────────────────────────────────────────────────────────────────────
// MagNet — Magnetic Laplacian Builder
// ─────────────────────────────────────────────────────────────────────
//! Directed graph + phase parameter q → Hermitian magnetic Laplacian.
//!
//!   A_s    = (A + Aᵀ) / 2
//!   Θ_uv   = 2π q (A_uv − A_vu)
//!   L      = D − A_s ∘ exp(iΘ)                      (unnormalized)
//!   L      = I − (D^{-1/2} A_s D^{-1/2}) ∘ exp(iΘ)  (symmetric)
//!
//! Θ is skew-symmetric, so `L_real` is symmetric and `L_imag` is
//! skew-symmetric. At q = 0 the imaginary part vanishes exactly and the
//! unnormalized real part is the ordinary `D − A_s`.

use serde::{Deserialize, Serialize};

use magnet_types::config::validate_q;
use magnet_types::{LaplacianNorm, MagNetError, MagNetResult};

use crate::graph::DirectedGraph;
use crate::sparse::CsrMatrix;

/// Hermitian Laplacian `real + i·imag`, both parts sparse `N×N`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagneticLaplacian {
    pub real: CsrMatrix,
    pub imag: CsrMatrix,
    q: f64,
    norm: LaplacianNorm,
}

/// Unnormalized magnetic Laplacian of `graph` at phase `q`.
pub fn build(graph: &DirectedGraph, q: f64) -> MagNetResult<MagneticLaplacian> {
    MagneticLaplacian::build(graph, q, LaplacianNorm::Unnormalized)
}

impl MagneticLaplacian {
    /// Build the Laplacian. Pure and deterministic in `(graph, q, norm)`.
    pub fn build(graph: &DirectedGraph, q: f64, norm: LaplacianNorm) -> MagNetResult<Self> {
        validate_q(q)?;
        let n = graph.num_nodes();
        if n == 0 {
            return Err(MagNetError::EmptyGraph);
        }

        let a = graph.adjacency()?;
        let at = a.transpose()?;
        let a_sym = CsrMatrix::from_triplets(
            n,
            n,
            a.triplets()
                .chain(at.triplets())
                .map(|(r, c, v)| (r, c, 0.5 * v))
                .collect(),
        )?;

        let degree: Vec<f64> = (0..n)
            .map(|i| a_sym.values[a_sym.row_ptr[i]..a_sym.row_ptr[i + 1]].iter().sum())
            .collect();
        let scale: Vec<f64> = match norm {
            LaplacianNorm::Unnormalized => vec![1.0; n],
            LaplacianNorm::Symmetric => degree
                .iter()
                .map(|&d| if d > 0.0 { 1.0 / d.sqrt() } else { 0.0 })
                .collect(),
        };

        let tau = std::f64::consts::TAU;
        let mut re = Vec::with_capacity(a_sym.nnz() + n);
        let mut im = Vec::with_capacity(a_sym.nnz());
        for (u, v, w) in a_sym.triplets() {
            let theta = tau * q * (a.get(u, v) - a.get(v, u));
            let w = w * scale[u] * scale[v];
            re.push((u, v, -w * theta.cos()));
            im.push((u, v, -w * theta.sin()));
        }
        match norm {
            LaplacianNorm::Unnormalized => {
                re.extend(degree.iter().enumerate().map(|(i, &d)| (i, i, d)))
            }
            LaplacianNorm::Symmetric => re.extend((0..n).map(|i| (i, i, 1.0))),
        }

        let lap = Self {
            real: CsrMatrix::from_triplets(n, n, re)?,
            imag: CsrMatrix::from_triplets(n, n, im)?,
            q,
            norm,
        };
        log::debug!(
            "magnetic Laplacian: n={n}, q={q}, norm={norm:?}, nnz(real)={}, nnz(imag)={}",
            lap.real.nnz(),
            lap.imag.nnz()
        );
        Ok(lap)
    }

    pub fn num_nodes(&self) -> usize {
        self.real.n_rows
    }

    pub fn q(&self) -> f64 {
        self.q
    }

    pub fn norm(&self) -> LaplacianNorm {
        self.norm
    }

    /// `L_real` symmetric and `L_imag` skew-symmetric within `tol`.
    pub fn is_hermitian(&self, tol: f64) -> bool {
        self.real.is_symmetric(tol) && self.imag.is_skew_symmetric(tol)
    }
}
