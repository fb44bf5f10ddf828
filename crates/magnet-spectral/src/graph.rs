// ─────────────────────────────────────────────────────────────────────
// MagNet — Directed Graph
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use magnet_types::{MagNetError, MagNetResult};

use crate::sparse::CsrMatrix;

/// Weighted directed graph over nodes `0..num_nodes`. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectedGraph {
    num_nodes: usize,
    edges: Vec<(usize, usize, f64)>,
}

impl DirectedGraph {
    /// Build from weighted edges `(u, v, w)` meaning `u → v`.
    pub fn new(num_nodes: usize, edges: Vec<(usize, usize, f64)>) -> MagNetResult<Self> {
        for &(u, v, w) in &edges {
            if u >= num_nodes || v >= num_nodes {
                return Err(MagNetError::Dataset(format!(
                    "edge ({u}, {v}) references a node outside 0..{num_nodes}"
                )));
            }
            if !w.is_finite() || w < 0.0 {
                return Err(MagNetError::Dataset(format!(
                    "edge ({u}, {v}) has invalid weight {w}"
                )));
            }
        }
        Ok(Self { num_nodes, edges })
    }

    /// Unit-weight edges.
    pub fn from_edges(num_nodes: usize, edges: &[(usize, usize)]) -> MagNetResult<Self> {
        Self::new(num_nodes, edges.iter().map(|&(u, v)| (u, v, 1.0)).collect())
    }

    /// Directed cycle `0 → 1 → … → n−1 → 0`.
    pub fn cycle(n: usize) -> MagNetResult<Self> {
        let edges: Vec<(usize, usize)> = (0..n).map(|i| (i, (i + 1) % n)).collect();
        Self::from_edges(n, &edges)
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> &[(usize, usize, f64)] {
        &self.edges
    }

    /// Directed adjacency `A[u, v] = w(u → v)`, duplicates summed.
    pub fn adjacency(&self) -> MagNetResult<CsrMatrix> {
        CsrMatrix::from_triplets(self.num_nodes, self.num_nodes, self.edges.clone())
    }

    /// Stable SHA-256 digest of the node count and edge list (hex).
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.num_nodes as u64).to_le_bytes());
        for &(u, v, w) in &self.edges {
            hasher.update((u as u64).to_le_bytes());
            hasher.update((v as u64).to_le_bytes());
            hasher.update(w.to_bits().to_le_bytes());
        }
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}
