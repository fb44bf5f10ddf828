// ─────────────────────────────────────────────────────────────────────
// MagNet — Run Reports
// ─────────────────────────────────────────────────────────────────────
//! Text and JSON artifacts: per-split epoch logs, predicted labels,
//! the run settings and the final `S×4` result table.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use magnet_types::{MagNetConfig, MagNetError, MagNetResult, ResultTable, SplitResult};

use crate::controller::EpochStats;

/// One `log{split}.csv` line.
pub fn epoch_line(epoch: usize, max_epochs: usize, s: &EpochStats) -> String {
    format!(
        "{epoch} ,/, {max_epochs} ,epoch,Train loss:, {:8.6}, acc:, {:5.3}, Test loss:, {:8.6}, acc:, {:5.3},---, {:.4}, seconds ---",
        s.train_loss, s.train_acc, s.val_loss, s.val_acc, s.seconds
    )
}

/// Final accuracy line of a split.
pub fn summary_line(r: &SplitResult) -> String {
    format!(
        "val_acc: {:5.3}, test_acc: {:5.3}, val_acc_latest: {:5.3}, test_acc_latest: {:5.3}",
        r.val_acc_best, r.test_acc_best, r.val_acc_latest, r.test_acc_latest
    )
}

/// Epoch lines followed by the summary line.
pub fn write_split_log(path: &Path, lines: &[String], summary: &str) -> MagNetResult<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for line in lines {
        writeln!(out, "{line}")?;
    }
    writeln!(out, "{summary}")?;
    out.flush()?;
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> MagNetResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| MagNetError::Config(format!("JSON encode error: {e}")))?;
    fs::write(path, json)?;
    Ok(())
}

/// Predicted class per node.
pub fn write_predictions(path: &Path, preds: &[usize]) -> MagNetResult<()> {
    write_json(path, preds)
}

pub fn read_predictions(path: &Path) -> MagNetResult<Vec<usize>> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map_err(|e| MagNetError::Dataset(format!("{}: {e}", path.display())))
}

pub fn write_settings(path: &Path, cfg: &MagNetConfig) -> MagNetResult<()> {
    fs::write(path, cfg.to_json()?)?;
    Ok(())
}

/// `S×4` accuracy matrix as CSV (with header) plus the full table as JSON.
pub fn write_results(csv: &Path, json: &Path, table: &ResultTable) -> MagNetResult<()> {
    let mut out = BufWriter::new(File::create(csv)?);
    writeln!(out, "split,{}", ResultTable::COLUMNS.join(","))?;
    for r in &table.splits {
        let [a, b, c, d] = r.row();
        writeln!(out, "{},{a},{b},{c},{d}", r.split)?;
    }
    out.flush()?;
    write_json(json, table)
}

/// Mean and standard deviation of each column at `info`.
pub fn log_summary(table: &ResultTable) {
    if table.is_empty() {
        log::warn!("no split results to summarize");
        return;
    }
    let mean = table.mean();
    let std = table.std();
    for (i, name) in ResultTable::COLUMNS.iter().enumerate() {
        log::info!("{name:>16}: {:.4} ± {:.4}", mean[i], std[i]);
    }
}
