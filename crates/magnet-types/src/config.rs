// ─────────────────────────────────────────────────────────────────────
// MagNet — Run Configuration
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::dataset::DatasetKind;
use crate::error::{MagNetError, MagNetResult};

/// Largest phase parameter before the phase aliases.
pub const Q_MAX: f64 = 0.5;

/// Laplacian normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaplacianNorm {
    /// `L = D − Γ∘A_s`.
    #[default]
    Unnormalized,
    /// `L = I − Γ∘(D^{-1/2} A_s D^{-1/2})`.
    Symmetric,
}

/// How the Chebyshev rescaling constant is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LambdaMax {
    /// Power iteration on the Laplacian.
    #[default]
    Estimated,
    /// Fixed value; checked against the estimated spectral radius.
    Fixed(f64),
}

/// Nonlinearity applied after every convolution layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// Gate both parts by `Re ≥ 0`.
    #[default]
    ComplexRelu,
    /// Independent ReLU on the real and imaginary parts.
    SplitRelu,
}

/// Configuration for one MagNet training run.
///
/// Passed explicitly to the Laplacian builder and the split controller;
/// nothing here is read from process-wide state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MagNetConfig {
    /// Dataset tag, `"<family>/<subset>"`.
    pub dataset: String,
    /// Root folder holding the preprocessed dataset files.
    pub data_path: String,
    /// Root of the per-run log/checkpoint directories.
    pub log_root: String,
    /// Sub-folder under `log_root` (and `result_root`) for this experiment.
    pub log_path: String,
    /// Root folder of the final accuracy tables.
    pub result_root: String,
    pub method_name: String,

    /// Maximum training epochs per split.
    pub epochs: usize,
    /// Phase strength, in [0, 0.5].
    pub q: f64,
    /// Chebyshev order.
    pub k: usize,
    /// Number of stacked convolution layers.
    pub layer: usize,
    /// Channel width of every convolution layer.
    pub num_filter: usize,
    pub dropout: f64,
    pub lr: f64,
    /// L2 weight decay folded into the optimizer gradient.
    pub l2: f64,
    /// Deterministic initialisation when > 0.
    pub randomseed: i64,
    /// Consecutive non-improving epochs tolerated before stopping.
    pub patience: usize,

    pub normalization: LaplacianNorm,
    pub lambda_max: LambdaMax,
    pub activation: Activation,

    /// Debug mode: a single epoch per split.
    pub debug: bool,
}

impl Default for MagNetConfig {
    fn default() -> Self {
        Self {
            dataset: "WebKB/Cornell".to_string(),
            data_path: "../dataset/data/tmp/".to_string(),
            log_root: "../logs/".to_string(),
            log_path: "test".to_string(),
            result_root: "../result_arrays/".to_string(),
            method_name: "Magnet".to_string(),
            epochs: 3000,
            q: 0.25,
            k: 1,
            layer: 2,
            num_filter: 16,
            dropout: 0.5,
            lr: 5e-3,
            l2: 5e-4,
            randomseed: 3407,
            patience: 500,
            normalization: LaplacianNorm::Unnormalized,
            lambda_max: LambdaMax::Estimated,
            activation: Activation::ComplexRelu,
            debug: false,
        }
    }
}

impl MagNetConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> MagNetResult<()> {
        validate_q(self.q)?;
        self.dataset_kind()?;
        if self.epochs == 0 {
            return Err(MagNetError::Config("epochs must be >= 1".to_string()));
        }
        if self.layer == 0 {
            return Err(MagNetError::Config("layer must be >= 1".to_string()));
        }
        if self.num_filter == 0 {
            return Err(MagNetError::Config("num_filter must be >= 1".to_string()));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(MagNetError::Config(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        if !self.lr.is_finite() || self.lr <= 0.0 {
            return Err(MagNetError::Config(format!(
                "lr must be > 0, got {}",
                self.lr
            )));
        }
        if !self.l2.is_finite() || self.l2 < 0.0 {
            return Err(MagNetError::Config(format!(
                "l2 must be >= 0, got {}",
                self.l2
            )));
        }
        if let LambdaMax::Fixed(v) = self.lambda_max {
            if !v.is_finite() || v <= 0.0 {
                return Err(MagNetError::Config(format!(
                    "lambda_max must be > 0, got {v}"
                )));
            }
        }
        Ok(())
    }

    /// Parsed dataset tag.
    pub fn dataset_kind(&self) -> MagNetResult<DatasetKind> {
        DatasetKind::parse(&self.dataset)
    }

    /// Epoch cap after applying debug mode.
    pub fn effective_epochs(&self) -> usize {
        if self.debug {
            1
        } else {
            self.epochs
        }
    }

    /// Seed for deterministic runs, `None` when the seed is disabled.
    pub fn seed(&self) -> Option<u64> {
        (self.randomseed > 0).then_some(self.randomseed as u64)
    }

    /// Experiment name used for the log folder and the result table.
    pub fn save_name(&self) -> String {
        format!(
            "{}lr{}num_filters{}q{}layer{}K{}",
            self.method_name,
            (1000.0 * self.lr) as i64,
            self.num_filter,
            (100.0 * self.q) as i64,
            self.layer,
            self.k
        )
    }

    /// Load from JSON string.
    pub fn from_json(json: &str) -> MagNetResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| MagNetError::Config(format!("JSON parse error: {e}")))
    }

    pub fn to_json(&self) -> MagNetResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| MagNetError::Config(format!("JSON encode error: {e}")))
    }
}

/// Reject phase parameters outside [0, 0.5].
pub fn validate_q(q: f64) -> MagNetResult<()> {
    if !(0.0..=Q_MAX).contains(&q) {
        return Err(MagNetError::InvalidParameter(format!(
            "q must be in [0, {Q_MAX}], got {q}"
        )));
    }
    Ok(())
}
