// ─────────────────────────────────────────────────────────────────────
// MagNet — Split Controller
// ─────────────────────────────────────────────────────────────────────
//! Per-split state machine:
//!
//!   Init → Training → EarlyStopped | MaxEpochReached → Tested → Done
//!
//! Training runs whole-graph epochs until the patience counter is
//! exhausted or the epoch cap is hit. A validation loss that ties or
//! beats the best so far refreshes the best checkpoint and resets the
//! counter. A non-finite loss aborts the split before any checkpoint is
//! written for that epoch.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use magnet_nn::{accuracy, nll_logits_grad, nll_loss, Adam, Checkpoint, MagNet, ModelSpec};
use magnet_types::{MagNetConfig, MagNetError, MagNetResult, SplitResult, StopReason};

use crate::paths::RunPaths;
use crate::pipeline::PreparedGraph;
use crate::report;
use crate::splits::SplitIndices;

/// Lifecycle of one split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitState {
    Init,
    Training,
    EarlyStopped,
    MaxEpochReached,
    Tested,
    Done,
}

/// Metrics of one epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochStats {
    pub train_loss: f64,
    pub train_acc: f64,
    pub val_loss: f64,
    pub val_acc: f64,
    pub seconds: f64,
}

/// Patience tracker over validation losses.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    best: f64,
    counter: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            best: f64::INFINITY,
            counter: 0,
        }
    }

    /// Record a validation loss; `true` when it ties or beats the best.
    pub fn observe(&mut self, val_loss: f64) -> bool {
        if val_loss <= self.best {
            self.best = val_loss;
            self.counter = 0;
            true
        } else {
            self.counter += 1;
            false
        }
    }

    /// Counter has exceeded the patience.
    pub fn exhausted(&self) -> bool {
        self.counter > self.patience
    }

    pub fn best(&self) -> f64 {
        self.best
    }

    pub fn counter(&self) -> usize {
        self.counter
    }
}

/// One split's trainable state, as seen by the epoch loop.
pub trait SplitSession {
    /// Train for one epoch, then evaluate on the validation mask.
    fn run_epoch(&mut self, epoch: usize) -> MagNetResult<EpochStats>;

    fn save_best(&mut self, epoch: usize, val_loss: f64) -> MagNetResult<()>;

    fn save_latest(&mut self, epoch: usize, val_loss: f64) -> MagNetResult<()>;
}

/// Result of the training phase.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub epochs_run: usize,
    pub stop_reason: StopReason,
    pub best_epoch: usize,
    pub best_val_loss: f64,
    pub latest_val_loss: f64,
    /// `log{split}.csv` epoch lines.
    pub lines: Vec<String>,
}

/// Epoch loop shared by every session type.
pub fn train_split<S: SplitSession>(
    session: &mut S,
    split: usize,
    max_epochs: usize,
    patience: usize,
) -> MagNetResult<TrainOutcome> {
    if max_epochs == 0 {
        return Err(MagNetError::Config("epochs must be >= 1".to_string()));
    }
    let mut stopper = EarlyStopping::new(patience);
    let mut lines = Vec::new();
    let mut best_epoch = 0;

    for epoch in 0..max_epochs {
        let stats = session.run_epoch(epoch)?;
        for loss in [stats.train_loss, stats.val_loss] {
            if !loss.is_finite() {
                return Err(MagNetError::Diverged { split, epoch, loss });
            }
        }
        let line = report::epoch_line(epoch, max_epochs, &stats);
        log::debug!("split {split}: {line}");
        lines.push(line);

        if stopper.observe(stats.val_loss) {
            best_epoch = epoch;
            session.save_best(epoch, stats.val_loss)?;
        }
        let last = epoch + 1 == max_epochs;
        if stopper.exhausted() || last {
            session.save_latest(epoch, stats.val_loss)?;
            let stop_reason = if stopper.exhausted() {
                StopReason::EarlyStopped
            } else {
                StopReason::MaxEpochReached
            };
            return Ok(TrainOutcome {
                epochs_run: epoch + 1,
                stop_reason,
                best_epoch,
                best_val_loss: stopper.best(),
                latest_val_loss: stats.val_loss,
                lines,
            });
        }
    }
    unreachable!("epoch loop always returns on its final iteration")
}

/// Live model, optimizer and data for one split.
struct ModelSession<'a> {
    split: usize,
    model: MagNet,
    opt: Adam,
    graph: &'a PreparedGraph,
    masks: SplitIndices<'a>,
    paths: &'a RunPaths,
}

impl SplitSession for ModelSession<'_> {
    fn run_epoch(&mut self, epoch: usize) -> MagNetResult<EpochStats> {
        let start = Instant::now();
        let g = self.graph;

        let pass = self.model.forward_train(&g.features)?;
        let train_loss = nll_loss(pass.log_probs(), &g.labels, self.masks.train)?;
        let train_acc = accuracy(&pass.predictions(), &g.labels, self.masks.train);
        if !train_loss.is_finite() {
            return Err(MagNetError::Diverged {
                split: self.split,
                epoch,
                loss: train_loss,
            });
        }
        let grad = nll_logits_grad(pass.log_probs(), &g.labels, self.masks.train)?;
        let grads = self.model.backward(&pass, &grad)?;
        self.opt.step(self.model.params_mut(), &grads)?;
        check_params(&self.model, self.split, epoch)?;

        let eval = self.model.forward_eval(&g.features)?;
        let val_loss = nll_loss(eval.log_probs(), &g.labels, self.masks.val)?;
        let val_acc = accuracy(&eval.predictions(), &g.labels, self.masks.val);

        Ok(EpochStats {
            train_loss,
            train_acc,
            val_loss,
            val_acc,
            seconds: start.elapsed().as_secs_f64(),
        })
    }

    fn save_best(&mut self, epoch: usize, val_loss: f64) -> MagNetResult<()> {
        self.model
            .checkpoint(epoch, val_loss)
            .save(&self.paths.best_checkpoint(self.split))
    }

    fn save_latest(&mut self, epoch: usize, val_loss: f64) -> MagNetResult<()> {
        self.model
            .checkpoint(epoch, val_loss)
            .save(&self.paths.latest_checkpoint(self.split))
    }
}

/// Fails with the index of the first parameter tensor holding NaN or ±∞.
fn check_params(model: &MagNet, split: usize, epoch: usize) -> MagNetResult<()> {
    match model.non_finite_tensor() {
        Some(tensor) => Err(MagNetError::ParametersDiverged {
            split,
            epoch,
            tensor,
        }),
        None => Ok(()),
    }
}

/// Drives one split from `Init` to `Done`.
pub struct SplitController<'a> {
    split: usize,
    cfg: &'a MagNetConfig,
    graph: &'a PreparedGraph,
    masks: SplitIndices<'a>,
    paths: &'a RunPaths,
    state: SplitState,
}

impl<'a> SplitController<'a> {
    pub fn new(
        split: usize,
        cfg: &'a MagNetConfig,
        graph: &'a PreparedGraph,
        masks: SplitIndices<'a>,
        paths: &'a RunPaths,
    ) -> Self {
        Self {
            split,
            cfg,
            graph,
            masks,
            paths,
            state: SplitState::Init,
        }
    }

    pub fn state(&self) -> SplitState {
        self.state
    }

    fn transition(&mut self, next: SplitState) {
        log::debug!("split {}: {:?} → {:?}", self.split, self.state, next);
        self.state = next;
    }

    /// Train, test both checkpoints and write the split's artifacts.
    pub fn run(&mut self) -> MagNetResult<SplitResult> {
        let g = self.graph;
        let spec = ModelSpec::from_config(self.cfg, g.features.ncols(), g.num_classes);
        let model = MagNet::new(Arc::clone(&g.propagator), spec, self.cfg.seed())?;
        log::debug!("split {}: {} trainable parameters", self.split, model.num_parameters());
        let opt = Adam::new(&model.params(), self.cfg.lr, self.cfg.l2);
        let mut session = ModelSession {
            split: self.split,
            model,
            opt,
            graph: g,
            masks: self.masks,
            paths: self.paths,
        };

        self.transition(SplitState::Training);
        let outcome = train_split(
            &mut session,
            self.split,
            self.cfg.effective_epochs(),
            self.cfg.patience,
        )?;
        self.transition(match outcome.stop_reason {
            StopReason::EarlyStopped => SplitState::EarlyStopped,
            StopReason::MaxEpochReached => SplitState::MaxEpochReached,
        });
        log::info!(
            "split {}: {:?} after {} epochs (best epoch {}, val loss {:.6})",
            self.split,
            outcome.stop_reason,
            outcome.epochs_run,
            outcome.best_epoch,
            outcome.best_val_loss
        );

        let mut model = session.model;
        if self.masks.test.is_empty() {
            log::warn!("split {}: empty test mask, test accuracy reported as 0", self.split);
        }
        let (val_acc_best, test_acc_best) = self.evaluate(
            &mut model,
            &self.paths.best_checkpoint(self.split),
            &self.paths.predictions(self.split),
        )?;
        let (val_acc_latest, test_acc_latest) = self.evaluate(
            &mut model,
            &self.paths.latest_checkpoint(self.split),
            &self.paths.latest_predictions(self.split),
        )?;
        self.transition(SplitState::Tested);

        let result = SplitResult {
            split: self.split,
            val_acc_best,
            test_acc_best,
            val_acc_latest,
            test_acc_latest,
            best_val_loss: outcome.best_val_loss,
            latest_val_loss: outcome.latest_val_loss,
            epochs_run: outcome.epochs_run,
            stop_reason: outcome.stop_reason,
        };
        let summary = report::summary_line(&result);
        log::info!("split {}: {summary}", self.split);
        report::write_split_log(&self.paths.split_log(self.split), &outcome.lines, &summary)?;
        self.transition(SplitState::Done);
        Ok(result)
    }

    /// Reload `ckpt`, dump predictions, return `(val_acc, test_acc)`.
    fn evaluate(&self, model: &mut MagNet, ckpt: &Path, preds_out: &Path) -> MagNetResult<(f64, f64)> {
        model.restore(&Checkpoint::load(ckpt)?)?;
        let preds = model.forward_eval(&self.graph.features)?.predictions();
        report::write_predictions(preds_out, &preds)?;
        Ok((
            accuracy(&preds, &self.graph.labels, self.masks.val),
            accuracy(&preds, &self.graph.labels, self.masks.test),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays a fixed validation-loss sequence.
    struct Scripted {
        val: Vec<f64>,
        best_saves: Vec<usize>,
        latest_saves: Vec<usize>,
    }

    impl Scripted {
        fn new(val: Vec<f64>) -> Self {
            Self {
                val,
                best_saves: Vec::new(),
                latest_saves: Vec::new(),
            }
        }
    }

    impl SplitSession for Scripted {
        fn run_epoch(&mut self, epoch: usize) -> MagNetResult<EpochStats> {
            let val_loss = self.val.get(epoch).copied().unwrap_or(10.0);
            Ok(EpochStats {
                train_loss: 1.0,
                train_acc: 0.5,
                val_loss,
                val_acc: 0.5,
                seconds: 0.0,
            })
        }

        fn save_best(&mut self, epoch: usize, _: f64) -> MagNetResult<()> {
            self.best_saves.push(epoch);
            Ok(())
        }

        fn save_latest(&mut self, epoch: usize, _: f64) -> MagNetResult<()> {
            self.latest_saves.push(epoch);
            Ok(())
        }
    }

    #[test]
    fn test_stops_exactly_patience_plus_one_after_last_improvement() {
        let patience = 5;
        // improvements at epochs 0..=3, then flat-out worse
        let mut s = Scripted::new(vec![4.0, 3.0, 2.0, 1.0]);
        let out = train_split(&mut s, 0, 1000, patience).unwrap();
        assert_eq!(out.stop_reason, StopReason::EarlyStopped);
        assert_eq!(out.best_epoch, 3);
        assert_eq!(out.epochs_run, 3 + patience + 1 + 1);
        assert_eq!(s.latest_saves, vec![3 + patience + 1]);
        assert_eq!(s.best_saves, vec![0, 1, 2, 3]);
        assert_eq!(out.best_val_loss, 1.0);
        assert_eq!(out.latest_val_loss, 10.0);
    }

    #[test]
    fn test_ties_reset_patience() {
        let mut s = Scripted::new(vec![1.0; 8]);
        let out = train_split(&mut s, 0, 8, 2).unwrap();
        assert_eq!(out.stop_reason, StopReason::MaxEpochReached);
        assert_eq!(s.best_saves.len(), 8);
        assert_eq!(out.best_epoch, 7);
    }

    #[test]
    fn test_max_epochs_reached() {
        let mut s = Scripted::new(vec![3.0, 2.0, 1.0]);
        let out = train_split(&mut s, 0, 3, 500).unwrap();
        assert_eq!(out.stop_reason, StopReason::MaxEpochReached);
        assert_eq!(out.epochs_run, 3);
        assert_eq!(s.latest_saves, vec![2]);
        assert_eq!(out.lines.len(), 3);
    }

    #[test]
    fn test_single_epoch_saves_both() {
        let mut s = Scripted::new(vec![0.7]);
        let out = train_split(&mut s, 0, 1, 500).unwrap();
        assert_eq!((s.best_saves.clone(), s.latest_saves.clone()), (vec![0], vec![0]));
        assert_eq!(out.best_val_loss, out.latest_val_loss);
    }

    #[test]
    fn test_non_finite_loss_is_fatal_before_saving() {
        let mut s = Scripted::new(vec![1.0, f64::NAN]);
        let err = train_split(&mut s, 4, 100, 10).unwrap_err();
        assert!(matches!(err, MagNetError::Diverged { split: 4, epoch: 1, .. }));
        assert_eq!(s.best_saves, vec![0]);
        assert!(s.latest_saves.is_empty());
    }

    #[test]
    fn test_non_finite_parameters_name_the_tensor() {
        use magnet_spectral::{
            build, estimate_lambda_max, ChebyshevPropagator, DirectedGraph, RescaledLaplacian,
        };
        use magnet_types::Activation;

        let lap = build(&DirectedGraph::cycle(4).unwrap(), 0.25).unwrap();
        let lam = estimate_lambda_max(&lap).unwrap();
        let prop = Arc::new(ChebyshevPropagator::new(
            RescaledLaplacian::new(&lap, lam).unwrap(),
            1,
        ));
        let spec = ModelSpec {
            in_features: 4,
            num_filter: 2,
            layers: 1,
            classes: 2,
            dropout: 0.0,
            activation: Activation::ComplexRelu,
        };
        let mut model = MagNet::new(prop, spec, Some(1)).unwrap();
        assert!(check_params(&model, 2, 9).is_ok());

        model.params_mut()[1][[0, 0]] = f64::NAN;
        let err = check_params(&model, 2, 9).unwrap_err();
        assert!(matches!(
            err,
            MagNetError::ParametersDiverged { split: 2, epoch: 9, tensor: 1 }
        ));
        assert!(!err.to_string().contains("loss"));
    }

    #[test]
    fn test_early_stopping_counter() {
        let mut es = EarlyStopping::new(1);
        assert!(es.observe(2.0));
        assert!(!es.observe(3.0));
        assert!(!es.exhausted());
        assert!(!es.observe(3.0));
        assert!(es.exhausted());
        assert!(es.observe(2.0));
        assert_eq!(es.counter(), 0);
    }
}
