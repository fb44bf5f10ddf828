// ─────────────────────────────────────────────────────────────────────
// MagNet — Parameter Snapshots
// ─────────────────────────────────────────────────────────────────────
//! JSON checkpoints. Floats round-trip exactly, so a reloaded model
//! reproduces the saved predictions bit for bit.

use std::fs;
use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use magnet_types::{MagNetError, MagNetResult};

/// Parameters in `MagNet::params()` order plus the epoch they were taken at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub epoch: usize,
    pub val_loss: f64,
    pub params: Vec<Array2<f64>>,
}

impl Checkpoint {
    /// Write to `path`, replacing any previous snapshot.
    pub fn save(&self, path: &Path) -> MagNetResult<()> {
        let json = serde_json::to_string(self)
            .map_err(|e| MagNetError::Checkpoint(format!("encode {}: {e}", path.display())))?;
        fs::write(path, json).map_err(|e| {
            MagNetError::Checkpoint(format!("cannot write {}: {e}", path.display()))
        })
    }

    pub fn load(path: &Path) -> MagNetResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            MagNetError::Checkpoint(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text)
            .map_err(|e| MagNetError::Checkpoint(format!("decode {}: {e}", path.display())))
    }
}
