// ─────────────────────────────────────────────────────────────────────
// MagNet — Training Controller
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Dataset loading, split-wise training/evaluation and run reporting.
//!
//! Per split the controller walks
//! `Init → Training → EarlyStopped | MaxEpochReached → Tested → Done`,
//! owning a fresh model and optimizer each time. The Laplacian, its
//! propagator and the feature block are built once per run and shared
//! read-only by every split.

pub mod controller;
pub mod dataset;
pub mod paths;
pub mod pipeline;
pub mod report;
pub mod splits;

pub use controller::{EarlyStopping, EpochStats, SplitController, SplitSession, SplitState};
pub use dataset::{loader_for, Dataset, DatasetLoader, JsonDatasetLoader};
pub use paths::RunPaths;
pub use pipeline::{prepare, run, run_with_dataset, PreparedGraph};
pub use splits::{SplitIndices, SplitMasks};
