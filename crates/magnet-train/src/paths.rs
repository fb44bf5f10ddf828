// ─────────────────────────────────────────────────────────────────────
// MagNet — Run Directory Layout
// ─────────────────────────────────────────────────────────────────────
//! Where a run writes its checkpoints, predictions, logs and results.
//!
//! The log directory ends in `<timestamp>-<run id>`, so two runs with the
//! same configuration never share checkpoint files; within a run every
//! file name carries its split index.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use uuid::Uuid;

use magnet_types::{MagNetConfig, MagNetError, MagNetResult};

#[derive(Debug, Clone)]
pub struct RunPaths {
    log_dir: PathBuf,
    result_dir: PathBuf,
    save_name: String,
}

impl RunPaths {
    /// `log_root/log_path/method/dataset/save_name/<timestamp>-<id>` and
    /// `result_root/log_path/dataset/`, both created.
    pub fn create(cfg: &MagNetConfig) -> MagNetResult<Self> {
        let save_name = cfg.save_name();
        let run_id = format!(
            "{}-{}",
            Local::now().format("%m-%d-%H%M%S"),
            &Uuid::new_v4().simple().to_string()[..8]
        );
        let log_dir = Path::new(&cfg.log_root)
            .join(&cfg.log_path)
            .join(&cfg.method_name)
            .join(&cfg.dataset)
            .join(&save_name)
            .join(run_id);
        let result_dir = Path::new(&cfg.result_root)
            .join(&cfg.log_path)
            .join(&cfg.dataset);
        Self::at(log_dir, result_dir, save_name)
    }

    /// Explicit directories, created if missing.
    pub fn at(
        log_dir: impl Into<PathBuf>,
        result_dir: impl Into<PathBuf>,
        save_name: impl Into<String>,
    ) -> MagNetResult<Self> {
        let paths = Self {
            log_dir: log_dir.into(),
            result_dir: result_dir.into(),
            save_name: save_name.into(),
        };
        for dir in [&paths.log_dir, &paths.result_dir] {
            fs::create_dir_all(dir).map_err(|e| {
                MagNetError::Checkpoint(format!("cannot create {}: {e}", dir.display()))
            })?;
        }
        Ok(paths)
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn result_dir(&self) -> &Path {
        &self.result_dir
    }

    pub fn save_name(&self) -> &str {
        &self.save_name
    }

    pub fn best_checkpoint(&self, split: usize) -> PathBuf {
        self.log_dir.join(format!("model{split}.json"))
    }

    pub fn latest_checkpoint(&self, split: usize) -> PathBuf {
        self.log_dir.join(format!("model_latest{split}.json"))
    }

    pub fn predictions(&self, split: usize) -> PathBuf {
        self.log_dir.join(format!("pred{split}.json"))
    }

    pub fn latest_predictions(&self, split: usize) -> PathBuf {
        self.log_dir.join(format!("pred_latest{split}.json"))
    }

    pub fn split_log(&self, split: usize) -> PathBuf {
        self.log_dir.join(format!("log{split}.csv"))
    }

    pub fn settings(&self) -> PathBuf {
        self.log_dir.join("settings.json")
    }

    pub fn result_csv(&self) -> PathBuf {
        self.result_dir.join(format!("{}.csv", self.save_name))
    }

    pub fn result_json(&self) -> PathBuf {
        self.result_dir.join(format!("{}.json", self.save_name))
    }
}
