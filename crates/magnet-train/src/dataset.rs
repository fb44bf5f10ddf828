// ─────────────────────────────────────────────────────────────────────
// MagNet — Dataset Loading
// ─────────────────────────────────────────────────────────────────────
//! Dataset kinds mapped to loaders.
//!
//! Acquisition and preprocessing happen elsewhere; loaders read a JSON
//! file holding the edge list, node features, integer labels and split
//! masks, and validate it before anything is built from it.

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::Deserialize;

use magnet_spectral::DirectedGraph;
use magnet_types::{DatasetKind, MagNetError, MagNetResult};

use crate::splits::SplitMasks;

/// Validated node-classification dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub kind: DatasetKind,
    pub graph: DirectedGraph,
    /// `N × F` real node features.
    pub features: Array2<f64>,
    /// Class per node, shifted so the smallest label is 0.
    pub labels: Vec<usize>,
    pub num_classes: usize,
    pub splits: SplitMasks,
}

impl Dataset {
    /// Assemble and validate a dataset. Labels are shifted to start at 0.
    pub fn new(
        kind: DatasetKind,
        graph: DirectedGraph,
        features: Array2<f64>,
        labels: &[i64],
        splits: SplitMasks,
    ) -> MagNetResult<Self> {
        let n = graph.num_nodes();
        if n == 0 {
            return Err(MagNetError::EmptyGraph);
        }
        if features.nrows() != n || labels.len() != n || splits.num_nodes() != n {
            return Err(MagNetError::Dataset(format!(
                "{kind}: {n} nodes but {} feature rows, {} labels, masks over {} nodes",
                features.nrows(),
                labels.len(),
                splits.num_nodes()
            )));
        }
        if features.ncols() == 0 {
            return Err(MagNetError::Dataset(format!("{kind}: no feature columns")));
        }
        if !features.iter().all(|v| v.is_finite()) {
            return Err(MagNetError::Dataset(format!("{kind}: non-finite feature value")));
        }

        // One class per node at most; anything wider is a sparse or corrupt label set.
        let min = labels.iter().copied().min().unwrap_or(0);
        let max = labels.iter().copied().max().unwrap_or(0);
        let span = max
            .checked_sub(min)
            .and_then(|s| usize::try_from(s).ok())
            .filter(|&s| s < n)
            .ok_or_else(|| {
                MagNetError::Dataset(format!(
                    "{kind}: labels span [{min}, {max}], wider than the {n} nodes"
                ))
            })?;
        let labels: Vec<usize> = labels.iter().map(|&l| (l - min) as usize).collect();
        let num_classes = span + 1;

        Ok(Self {
            kind,
            graph,
            features,
            labels,
            num_classes,
            splits,
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.graph.num_nodes()
    }

    pub fn num_features(&self) -> usize {
        self.features.ncols()
    }
}

/// Source of a [`Dataset`] for one [`DatasetKind`].
pub trait DatasetLoader {
    fn kind(&self) -> &DatasetKind;

    /// Load from the data root (the configured `data_path`).
    fn load(&self, data_root: &Path) -> MagNetResult<Dataset>;
}

/// Loader for preprocessed JSON dataset files at
/// `data_root/<family>/<subset>.json`.
#[derive(Debug, Clone)]
pub struct JsonDatasetLoader {
    kind: DatasetKind,
}

impl JsonDatasetLoader {
    pub fn new(kind: DatasetKind) -> Self {
        Self { kind }
    }

    pub fn path(&self, data_root: &Path) -> PathBuf {
        data_root.join(self.kind.relative_path())
    }
}

impl DatasetLoader for JsonDatasetLoader {
    fn kind(&self) -> &DatasetKind {
        &self.kind
    }

    fn load(&self, data_root: &Path) -> MagNetResult<Dataset> {
        let path = self.path(data_root);
        let text = fs::read_to_string(&path).map_err(|e| {
            MagNetError::Dataset(format!("cannot read {}: {e}", path.display()))
        })?;
        let raw: RawDataset = serde_json::from_str(&text).map_err(|e| {
            MagNetError::Dataset(format!("malformed {}: {e}", path.display()))
        })?;
        let ds = raw.into_dataset(self.kind.clone())?;
        log::info!(
            "loaded {}: {} nodes, {} edges, {} features, {} classes, {} splits",
            ds.kind,
            ds.num_nodes(),
            ds.graph.num_edges(),
            ds.num_features(),
            ds.num_classes,
            ds.splits.num_splits()
        );
        Ok(ds)
    }
}

/// Loader for `kind`. Every kind currently reads the shared JSON layout;
/// the match is where a family-specific reader would plug in.
pub fn loader_for(kind: &DatasetKind) -> Box<dyn DatasetLoader> {
    match kind {
        DatasetKind::WebKb(_)
        | DatasetKind::CoraMl
        | DatasetKind::CiteseerNpz
        | DatasetKind::Synthetic(_) => Box::new(JsonDatasetLoader::new(kind.clone())),
    }
}

// ── On-disk layout ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEdge {
    Plain(usize, usize),
    Weighted(usize, usize, f64),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTestMask {
    PerSplit(Vec<Vec<bool>>),
    Single(Vec<bool>),
}

#[derive(Debug, Deserialize)]
struct RawDataset {
    num_nodes: usize,
    edges: Vec<RawEdge>,
    features: Vec<Vec<f64>>,
    labels: Vec<i64>,
    train_mask: Vec<Vec<bool>>,
    val_mask: Vec<Vec<bool>>,
    test_mask: RawTestMask,
}

impl RawDataset {
    fn into_dataset(self, kind: DatasetKind) -> MagNetResult<Dataset> {
        let n = self.num_nodes;
        let edges = self
            .edges
            .into_iter()
            .map(|e| match e {
                RawEdge::Plain(u, v) => (u, v, 1.0),
                RawEdge::Weighted(u, v, w) => (u, v, w),
            })
            .collect();
        let graph = DirectedGraph::new(n, edges)?;

        let width = self.features.first().map_or(0, Vec::len);
        if let Some(row) = self.features.iter().position(|r| r.len() != width) {
            return Err(MagNetError::Dataset(format!(
                "{kind}: feature row {row} has {} columns, expected {width}",
                self.features[row].len()
            )));
        }
        let rows = self.features.len();
        let flat: Vec<f64> = self.features.into_iter().flatten().collect();
        let features = Array2::from_shape_vec((rows, width), flat)
            .map_err(|e| MagNetError::Dataset(format!("{kind}: features: {e}")))?;

        let test = match self.test_mask {
            RawTestMask::PerSplit(m) => m,
            RawTestMask::Single(m) => vec![m],
        };
        let splits = SplitMasks::from_bool(n, &self.train_mask, &self.val_mask, &test)?;
        Dataset::new(kind, graph, features, &self.labels, splits)
    }
}
