// ─────────────────────────────────────────────────────────────────────
// MagNet — End-to-End Run Tests
// ─────────────────────────────────────────────────────────────────────
//! Whole-run scenarios on tiny directed graphs.

use std::fs;
use std::path::Path;

use ndarray::Array2;

use magnet_nn::Checkpoint;
use magnet_spectral::{DirectedGraph, LaplacianCache};
use magnet_train::report::read_predictions;
use magnet_train::{run, run_with_dataset, Dataset, RunPaths, SplitMasks};
use magnet_types::{DatasetKind, MagNetConfig, StopReason};

fn config(root: &Path) -> MagNetConfig {
    MagNetConfig {
        dataset: "syn/cycle4".to_string(),
        data_path: root.join("data").display().to_string(),
        log_root: root.join("logs").display().to_string(),
        result_root: root.join("results").display().to_string(),
        epochs: 150,
        q: 0.25,
        k: 1,
        layer: 1,
        num_filter: 4,
        dropout: 0.5,
        lr: 0.01,
        randomseed: 7,
        ..MagNetConfig::default()
    }
}

/// `0→1→2→3→0`, `X = I_4`, two classes.
fn cycle_dataset(splits: usize) -> Dataset {
    let masks = SplitMasks::from_indices(
        4,
        vec![vec![0, 1]; splits],
        vec![vec![2]; splits],
        vec![vec![3]],
    )
    .unwrap();
    Dataset::new(
        DatasetKind::parse("syn/cycle4").unwrap(),
        DirectedGraph::cycle(4).unwrap(),
        Array2::eye(4),
        &[0, 1, 0, 1],
        masks,
    )
    .unwrap()
}

#[test]
fn four_node_cycle_end_to_end() {
    let root = tempfile::tempdir().unwrap();
    let cfg = config(root.path());
    let paths = RunPaths::create(&cfg).unwrap();
    let table = run_with_dataset(&cfg, &cycle_dataset(1), &paths, &LaplacianCache::in_memory())
        .unwrap();

    assert_eq!(table.len(), 1);
    let r = &table.splits[0];
    for acc in r.row() {
        assert!((0.0..=1.0).contains(&acc), "accuracy {acc}");
    }
    assert!(r.best_val_loss <= r.latest_val_loss);
    assert_eq!(r.stop_reason, StopReason::MaxEpochReached);
    assert_eq!(r.epochs_run, 150);

    let best = Checkpoint::load(&paths.best_checkpoint(0)).unwrap();
    let latest = Checkpoint::load(&paths.latest_checkpoint(0)).unwrap();
    assert!(best.val_loss <= latest.val_loss);
    assert_eq!(latest.epoch, 149);
    assert_eq!(best.val_loss, r.best_val_loss);

    assert_eq!(read_predictions(&paths.predictions(0)).unwrap().len(), 4);
    assert_eq!(read_predictions(&paths.latest_predictions(0)).unwrap().len(), 4);

    let log = fs::read_to_string(paths.split_log(0)).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 151);
    assert!(lines[0].starts_with("0 ,/, 150 ,epoch,Train loss:,"));
    assert!(lines[150].starts_with("val_acc:"));

    let settings = fs::read_to_string(paths.settings()).unwrap();
    assert_eq!(MagNetConfig::from_json(&settings).unwrap().q, 0.25);
    assert!(paths.result_csv().is_file());
    assert!(paths.result_json().is_file());
}

#[test]
fn identical_splits_give_identical_rows() {
    let root = tempfile::tempdir().unwrap();
    let cfg = MagNetConfig {
        epochs: 40,
        ..config(root.path())
    };
    let paths = RunPaths::create(&cfg).unwrap();
    let table = run_with_dataset(&cfg, &cycle_dataset(2), &paths, &LaplacianCache::in_memory())
        .unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(table.splits[0].row(), table.splits[1].row());
    assert_eq!(table.splits[0].best_val_loss, table.splits[1].best_val_loss);
    assert_eq!(
        read_predictions(&paths.predictions(0)).unwrap(),
        read_predictions(&paths.predictions(1)).unwrap()
    );
}

#[test]
fn debug_mode_runs_one_epoch() {
    let root = tempfile::tempdir().unwrap();
    let cfg = MagNetConfig {
        debug: true,
        ..config(root.path())
    };
    let paths = RunPaths::create(&cfg).unwrap();
    let table = run_with_dataset(&cfg, &cycle_dataset(1), &paths, &LaplacianCache::in_memory())
        .unwrap();
    assert_eq!(table.splits[0].epochs_run, 1);
    assert_eq!(table.splits[0].best_val_loss, table.splits[0].latest_val_loss);
}

#[test]
fn run_from_dataset_file() {
    let root = tempfile::tempdir().unwrap();
    let cfg = MagNetConfig {
        epochs: 5,
        ..config(root.path())
    };
    let data_dir = root.path().join("data/syn");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(
        data_dir.join("cycle4.json"),
        r#"{
            "num_nodes": 4,
            "edges": [[0, 1], [1, 2], [2, 3], [3, 0]],
            "features": [[1, 0, 0, 0], [0, 1, 0, 0], [0, 0, 1, 0], [0, 0, 0, 1]],
            "labels": [0, 1, 0, 1],
            "train_mask": [[true, true, false, false], [true, false, true, false]],
            "val_mask": [[false, false, true, false], [false, true, false, false]],
            "test_mask": [false, false, false, true]
        }"#,
    )
    .unwrap();

    let (paths, table) = run(&cfg).unwrap();
    assert_eq!(table.len(), 2);
    assert!(paths.log_dir().starts_with(root.path().join("logs")));
    // the Laplacian was persisted for later runs
    let cached = fs::read_dir(data_dir.join("laplacian_cache")).unwrap().count();
    assert_eq!(cached, 1);
}

#[test]
fn rejects_unknown_dataset_before_work() {
    let root = tempfile::tempdir().unwrap();
    let cfg = MagNetConfig {
        dataset: "imagenet/full".to_string(),
        ..config(root.path())
    };
    assert!(run(&cfg).is_err());
    assert!(!root.path().join("logs").exists());
}
