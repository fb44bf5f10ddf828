// ─────────────────────────────────────────────────────────────────────
// MagNet — Split Results
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

/// Why a split's training loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Patience exhausted.
    EarlyStopped,
    /// Epoch cap reached.
    MaxEpochReached,
}

/// Outcome of one train/validate/test cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitResult {
    pub split: usize,
    /// Validation accuracy of the best-validation checkpoint.
    pub val_acc_best: f64,
    /// Test accuracy of the best-validation checkpoint.
    pub test_acc_best: f64,
    /// Validation accuracy of the latest checkpoint.
    pub val_acc_latest: f64,
    /// Test accuracy of the latest checkpoint.
    pub test_acc_latest: f64,
    /// Lowest validation loss seen (the best checkpoint's loss).
    pub best_val_loss: f64,
    /// Validation loss recorded at the stopping epoch.
    pub latest_val_loss: f64,
    /// Epochs actually run.
    pub epochs_run: usize,
    pub stop_reason: StopReason,
}

impl SplitResult {
    /// `(val_acc_best, test_acc_best, val_acc_latest, test_acc_latest)`.
    pub fn row(&self) -> [f64; 4] {
        [
            self.val_acc_best,
            self.test_acc_best,
            self.val_acc_latest,
            self.test_acc_latest,
        ]
    }
}

/// Split-indexed accuracy table, `S×4`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub splits: Vec<SplitResult>,
}

impl ResultTable {
    pub const COLUMNS: [&'static str; 4] = [
        "val_acc_best",
        "test_acc_best",
        "val_acc_latest",
        "test_acc_latest",
    ];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: SplitResult) {
        self.splits.push(result);
    }

    pub fn len(&self) -> usize {
        self.splits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }

    /// The `S×4` accuracy matrix.
    pub fn matrix(&self) -> Vec<[f64; 4]> {
        self.splits.iter().map(SplitResult::row).collect()
    }

    /// Column means.
    pub fn mean(&self) -> [f64; 4] {
        let mut out = [0.0; 4];
        if self.splits.is_empty() {
            return out;
        }
        for row in self.matrix() {
            for (o, v) in out.iter_mut().zip(row) {
                *o += v;
            }
        }
        let n = self.splits.len() as f64;
        out.map(|v| v / n)
    }

    /// Column population standard deviations.
    pub fn std(&self) -> [f64; 4] {
        let mean = self.mean();
        let mut out = [0.0; 4];
        if self.splits.is_empty() {
            return out;
        }
        for row in self.matrix() {
            for c in 0..4 {
                out[c] += (row[c] - mean[c]).powi(2);
            }
        }
        let n = self.splits.len() as f64;
        out.map(|v| (v / n).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(split: usize, acc: f64) -> SplitResult {
        SplitResult {
            split,
            val_acc_best: acc,
            test_acc_best: acc,
            val_acc_latest: acc / 2.0,
            test_acc_latest: acc / 2.0,
            best_val_loss: 0.1,
            latest_val_loss: 0.2,
            epochs_run: 10,
            stop_reason: StopReason::MaxEpochReached,
        }
    }

    #[test]
    fn test_matrix_shape() {
        let mut table = ResultTable::new();
        table.push(result(0, 0.8));
        table.push(result(1, 0.6));
        let m = table.matrix();
        assert_eq!(m.len(), 2);
        assert_eq!(m[1], [0.6, 0.6, 0.3, 0.3]);
    }

    #[test]
    fn test_mean_std() {
        let mut table = ResultTable::new();
        table.push(result(0, 0.8));
        table.push(result(1, 0.6));
        let mean = table.mean();
        let std = table.std();
        assert!((mean[0] - 0.7).abs() < 1e-12);
        assert!((std[0] - 0.1).abs() < 1e-12);
        assert!((mean[2] - 0.35).abs() < 1e-12);
    }

    #[test]
    fn test_empty_table_stats() {
        let table = ResultTable::new();
        assert!(table.is_empty());
        assert_eq!(table.mean(), [0.0; 4]);
        assert_eq!(table.std(), [0.0; 4]);
    }
}
