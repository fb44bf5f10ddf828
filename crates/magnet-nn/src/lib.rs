// ─────────────────────────────────────────────────────────────────────
// MagNet — Network Engine
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Complex spectral convolution network with a hand-written reverse pass.
//!
//! # Invariants
//!
//! 1. **Complex arithmetic is explicit**: every signal is a pair of real
//!    `N×F` blocks and every product is expanded into real products.
//!
//! 2. **Whole-graph passes**: forward and backward always cover all N
//!    nodes; masks only select which rows enter the loss.
//!
//! 3. **Parameter order is fixed**: `MagNet::params()` and the gradient
//!    vector returned by `MagNet::backward()` list tensors in the same
//!    order, which is also the checkpoint layout.
//!
//! 4. **Log-probabilities are normalised**: the head's output rows satisfy
//!    `Σ exp(row) = 1` up to rounding.

pub mod activation;
pub mod checkpoint;
pub mod conv;
pub mod head;
pub mod loss;
pub mod model;
pub mod optim;

pub use checkpoint::Checkpoint;
pub use conv::ChebConv;
pub use head::ClassifierHead;
pub use loss::{accuracy, argmax_rows, nll_loss, nll_logits_grad};
pub use model::{ForwardPass, MagNet, ModelSpec};
pub use optim::Adam;
