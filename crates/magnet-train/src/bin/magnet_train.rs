// ─────────────────────────────────────────────────────────────────────
// MagNet — Training CLI
// ─────────────────────────────────────────────────────────────────────
//! MagNet training binary.
//!
//! Trains and tests a complex spectral graph network on every split of a
//! node-classification dataset and writes checkpoints, logs, predictions
//! and the split-indexed accuracy table.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{error, info};

use magnet_types::{Activation, LambdaMax, LaplacianNorm, MagNetConfig};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum NormArg {
    #[value(name = "unnormalized")]
    Unnormalized,
    #[value(name = "symmetric")]
    Symmetric,
}

impl From<NormArg> for LaplacianNorm {
    fn from(arg: NormArg) -> Self {
        match arg {
            NormArg::Unnormalized => LaplacianNorm::Unnormalized,
            NormArg::Symmetric => LaplacianNorm::Symmetric,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ActivationArg {
    #[value(name = "complex-relu")]
    ComplexRelu,
    #[value(name = "split-relu")]
    SplitRelu,
}

impl From<ActivationArg> for Activation {
    fn from(arg: ActivationArg) -> Self {
        match arg {
            ActivationArg::ComplexRelu => Activation::ComplexRelu,
            ActivationArg::SplitRelu => Activation::SplitRelu,
        }
    }
}

/// Command line arguments for MagNet training
#[derive(Parser)]
#[command(name = "magnet-train")]
#[command(about = "MagNet: spectral graph convolution on directed graphs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// JSON configuration file; replaces all option flags except --debug
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dataset tag: WebKB/<Cornell|Texas|Wisconsin>, cora_ml/, citeseer_npz/, syn/<name>
    #[arg(long, default_value = "WebKB/Cornell")]
    dataset: String,

    /// Root of the preprocessed dataset files
    #[arg(long, default_value = "../dataset/data/tmp/")]
    data_path: String,

    #[arg(long, default_value = "../logs/")]
    log_root: String,

    /// Experiment folder under the log and result roots
    #[arg(long, default_value = "test")]
    log_path: String,

    #[arg(long, default_value = "../result_arrays/")]
    result_root: String,

    #[arg(long, default_value = "Magnet")]
    method_name: String,

    /// Maximum training epochs per split
    #[arg(long, default_value = "3000")]
    epochs: usize,

    /// Phase parameter in [0, 0.5]
    #[arg(short, long, default_value = "0.25")]
    q: f64,

    /// Chebyshev polynomial order
    #[arg(short = 'K', long = "K", default_value = "1")]
    k: usize,

    /// Number of convolution layers
    #[arg(long, default_value = "2")]
    layer: usize,

    /// Channels per convolution layer
    #[arg(long, default_value = "16")]
    num_filter: usize,

    #[arg(long, default_value = "0.5")]
    dropout: f64,

    /// Learning rate
    #[arg(long, default_value = "0.005")]
    lr: f64,

    /// L2 weight decay
    #[arg(long, default_value = "0.0005")]
    l2: f64,

    /// Seed for initialization and dropout; <= 0 draws from OS entropy
    #[arg(long, default_value = "3407", allow_hyphen_values = true)]
    randomseed: i64,

    /// Non-improving epochs tolerated before stopping
    #[arg(long, default_value = "500")]
    patience: usize,

    #[arg(long, value_enum, default_value = "unnormalized")]
    normalization: NormArg,

    /// Fixed λ_max instead of estimating it
    #[arg(long)]
    lambda_max: Option<f64>,

    #[arg(long, value_enum, default_value = "complex-relu")]
    activation: ActivationArg,

    /// Single epoch per split
    #[arg(short = 'D', long)]
    debug: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn to_config(&self) -> Result<MagNetConfig> {
        let mut cfg = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                MagNetConfig::from_json(&text)
                    .with_context(|| format!("Invalid config {}", path.display()))?
            }
            None => MagNetConfig {
                dataset: self.dataset.clone(),
                data_path: self.data_path.clone(),
                log_root: self.log_root.clone(),
                log_path: self.log_path.clone(),
                result_root: self.result_root.clone(),
                method_name: self.method_name.clone(),
                epochs: self.epochs,
                q: self.q,
                k: self.k,
                layer: self.layer,
                num_filter: self.num_filter,
                dropout: self.dropout,
                lr: self.lr,
                l2: self.l2,
                randomseed: self.randomseed,
                patience: self.patience,
                normalization: self.normalization.into(),
                lambda_max: self.lambda_max.map_or(LambdaMax::Estimated, LambdaMax::Fixed),
                activation: self.activation.into(),
                debug: false,
            },
        };
        cfg.debug |= self.debug;
        Ok(cfg)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .format_module_path(false)
        .init();

    let cfg = args.to_config()?;
    cfg.validate().context("Invalid configuration")?;

    info!("Configuration:");
    info!("  Dataset: {} (data root {})", cfg.dataset, cfg.data_path);
    info!(
        "  q={}, K={}, layers={}, filters={}, dropout={}",
        cfg.q, cfg.k, cfg.layer, cfg.num_filter, cfg.dropout
    );
    info!(
        "  lr={}, l2={}, epochs={}, patience={}, seed={}",
        cfg.lr,
        cfg.l2,
        cfg.effective_epochs(),
        cfg.patience,
        cfg.randomseed
    );

    match magnet_train::run(&cfg) {
        Ok((paths, table)) => {
            for r in &table.splits {
                let [a, b, c, d] = r.row();
                println!("split {}: {a:.3} {b:.3} {c:.3} {d:.3}", r.split);
            }
            println!("Results saved to: {}", paths.result_csv().display());
            Ok(())
        }
        Err(e) => {
            error!("Training failed: {e}");
            Err(e).context("MagNet run failed")
        }
    }
}
