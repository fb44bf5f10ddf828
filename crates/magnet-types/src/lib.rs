// ─────────────────────────────────────────────────────────────────────
// MagNet — Shared Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Run configuration, dataset tags, split results and the error
//! hierarchy shared by every MagNet crate.

pub mod config;
pub mod dataset;
pub mod error;
pub mod results;

pub use config::{Activation, LambdaMax, LaplacianNorm, MagNetConfig};
pub use dataset::{DatasetKind, WebKbSubset};
pub use error::{MagNetError, MagNetResult};
pub use results::{ResultTable, SplitResult, StopReason};
