// ─────────────────────────────────────────────────────────────────────
// MagNet — Run Pipeline
// ─────────────────────────────────────────────────────────────────────
//! Config → dataset → Laplacian → propagator → splits → result table.

use std::path::Path;
use std::sync::Arc;

use magnet_spectral::chebyshev::RescaledLaplacian;
use magnet_spectral::{resolve_lambda_max, ChebyshevPropagator, ComplexMatrix, LaplacianCache};
use magnet_types::{MagNetConfig, MagNetResult, ResultTable};

use crate::controller::SplitController;
use crate::dataset::{loader_for, Dataset};
use crate::paths::RunPaths;
use crate::report;

/// Read-only inputs shared by every split of a run.
#[derive(Debug, Clone)]
pub struct PreparedGraph {
    pub propagator: Arc<ChebyshevPropagator>,
    /// Initial complex signal, `X_re = X_im = X`.
    pub features: ComplexMatrix,
    pub labels: Vec<usize>,
    pub num_classes: usize,
    pub lambda_max: f64,
}

/// Build the Laplacian (through `cache`), rescale it and wrap the features.
pub fn prepare(
    cfg: &MagNetConfig,
    dataset: &Dataset,
    cache: &LaplacianCache,
) -> MagNetResult<PreparedGraph> {
    let lap = cache.get_or_build(&dataset.graph, cfg.q, cfg.normalization)?;
    let lambda_max = resolve_lambda_max(&lap, cfg.lambda_max)?;
    let op = RescaledLaplacian::new(&lap, lambda_max)?;
    log::info!(
        "{}: q={}, K={}, λ_max={lambda_max:.6}",
        dataset.kind,
        cfg.q,
        cfg.k
    );
    Ok(PreparedGraph {
        propagator: Arc::new(ChebyshevPropagator::new(op, cfg.k)),
        features: ComplexMatrix::from_real_features(&dataset.features),
        labels: dataset.labels.clone(),
        num_classes: dataset.num_classes,
        lambda_max,
    })
}

/// Full run from configuration. Returns the run paths and the result table.
pub fn run(cfg: &MagNetConfig) -> MagNetResult<(RunPaths, ResultTable)> {
    cfg.validate()?;
    let kind = cfg.dataset_kind()?;
    let data_root = Path::new(&cfg.data_path);
    let dataset = loader_for(&kind).load(data_root)?;

    let cache_dir = data_root.join(kind.family()).join("laplacian_cache");
    let cache = LaplacianCache::with_dir(&cache_dir).unwrap_or_else(|e| {
        log::warn!("Laplacian cache at {} unavailable ({e}); keeping it in memory", cache_dir.display());
        LaplacianCache::in_memory()
    });

    let paths = RunPaths::create(cfg)?;
    log::info!("run directory: {}", paths.log_dir().display());
    let table = run_with_dataset(cfg, &dataset, &paths, &cache)?;
    Ok((paths, table))
}

/// Train and test every split of an already loaded dataset.
pub fn run_with_dataset(
    cfg: &MagNetConfig,
    dataset: &Dataset,
    paths: &RunPaths,
    cache: &LaplacianCache,
) -> MagNetResult<ResultTable> {
    cfg.validate()?;
    report::write_settings(&paths.settings(), cfg)?;
    let graph = prepare(cfg, dataset, cache)?;

    let mut table = ResultTable::new();
    for split in 0..dataset.splits.num_splits() {
        let mut controller =
            SplitController::new(split, cfg, &graph, dataset.splits.split(split), paths);
        table.push(controller.run()?);
    }

    report::write_results(&paths.result_csv(), &paths.result_json(), &table)?;
    log::info!(
        "{} splits done, results in {}",
        table.len(),
        paths.result_csv().display()
    );
    report::log_summary(&table);
    Ok(table)
}
