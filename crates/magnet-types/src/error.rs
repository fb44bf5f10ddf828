// ─────────────────────────────────────────────────────────────────────
// MagNet — Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all MagNet failures.
#[derive(Error, Debug)]
pub enum MagNetError {
    /// A numeric parameter is outside its supported range (e.g. `q`).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The graph has no nodes.
    #[error("empty graph: node count is zero")]
    EmptyGraph,

    /// Unknown dataset tag or inconsistent run options.
    #[error("config error: {0}")]
    Config(String),

    /// Operand dimensions do not agree.
    #[error("shape mismatch: {0}")]
    Shape(String),

    /// Dataset file or split masks are malformed.
    #[error("dataset error: {0}")]
    Dataset(String),

    /// Numerical error (bad λ_max rescaling, NaN/Inf in computation).
    #[error("numerical error: {0}")]
    Numerical(String),

    /// Training or validation loss became non-finite.
    #[error("optimization diverged in split {split} at epoch {epoch}: loss = {loss}")]
    Diverged { split: usize, epoch: usize, loss: f64 },

    /// An optimizer step left NaN or ±∞ in a parameter tensor.
    #[error("parameters diverged in split {split} at epoch {epoch}: tensor {tensor} is non-finite")]
    ParametersDiverged {
        split: usize,
        epoch: usize,
        tensor: usize,
    },

    /// Checkpoint could not be written, read or applied.
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type MagNetResult<T> = Result<T, MagNetError>;
