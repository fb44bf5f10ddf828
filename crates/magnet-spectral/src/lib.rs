// ─────────────────────────────────────────────────────────────────────
// MagNet — Spectral Engine
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Directed graph → magnetic Laplacian → Chebyshev-filtered signals.
//!
//! Architecture:
//!   - DirectedGraph: immutable weighted edge list with a stable fingerprint
//!   - CsrMatrix: real sparse matrix, sparse × dense products
//!   - ComplexMatrix: paired real/imaginary dense feature blocks
//!   - MagneticLaplacian: Hermitian `L = D − Γ∘A_s` split into sparse parts
//!   - spectral: λ_max upper bound (Lanczos, Jacobi on the real embedding)
//!   - ChebyshevPropagator: `T_k(L̃) X` recursion and its adjoint
//!   - LaplacianCache: in-process + on-disk reuse keyed by (graph, q, norm)

pub mod cache;
pub mod chebyshev;
pub mod complex;
pub mod graph;
pub mod laplacian;
pub mod sparse;
pub mod spectral;

pub use cache::LaplacianCache;
pub use chebyshev::{propagate, ChebyshevPropagator, RescaledLaplacian};
pub use complex::ComplexMatrix;
pub use graph::DirectedGraph;
pub use laplacian::{build, MagneticLaplacian};
pub use sparse::CsrMatrix;
pub use spectral::{estimate_lambda_max, hermitian_eigenvalues, resolve_lambda_max};
