// ─────────────────────────────────────────────────────────────────────
// MagNet — Network Assembly
// ─────────────────────────────────────────────────────────────────────
//! Stacked complex Chebyshev convolutions followed by the classifier head.
//!
//! Every layer re-propagates its input through the shared, read-only
//! [`ChebyshevPropagator`]; the reverse pass walks the same stack and
//! crosses each propagation with its adjoint.

use std::sync::Arc;

use ndarray::Array2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use magnet_spectral::{ChebyshevPropagator, ComplexMatrix};
use magnet_types::{Activation, MagNetConfig, MagNetError, MagNetResult};

use crate::activation;
use crate::checkpoint::Checkpoint;
use crate::conv::{ChebConv, ChebConvGrads};
use crate::head::{dropout_mask, ClassifierHead};
use crate::loss::argmax_rows;

/// Architecture of one model instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    pub in_features: usize,
    pub num_filter: usize,
    pub layers: usize,
    pub classes: usize,
    pub dropout: f64,
    pub activation: Activation,
}

impl ModelSpec {
    pub fn from_config(cfg: &MagNetConfig, in_features: usize, classes: usize) -> Self {
        Self {
            in_features,
            num_filter: cfg.num_filter,
            layers: cfg.layer,
            classes,
            dropout: cfg.dropout,
            activation: cfg.activation,
        }
    }

    fn validate(&self) -> MagNetResult<()> {
        if self.in_features == 0 || self.num_filter == 0 || self.layers == 0 || self.classes == 0 {
            return Err(MagNetError::Config(format!(
                "model dimensions must be positive: {self:?}"
            )));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(MagNetError::Config(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        Ok(())
    }
}

/// Intermediate values of one forward pass, kept for the reverse pass.
#[derive(Debug, Clone)]
pub struct ForwardPass {
    layer_terms: Vec<Vec<ComplexMatrix>>,
    pre_activations: Vec<ComplexMatrix>,
    head_input: Array2<f64>,
    dropout_mask: Option<Array2<f64>>,
    log_probs: Array2<f64>,
}

impl ForwardPass {
    /// `N × classes` log-probabilities.
    pub fn log_probs(&self) -> &Array2<f64> {
        &self.log_probs
    }

    pub fn predictions(&self) -> Vec<usize> {
        argmax_rows(&self.log_probs)
    }

    pub fn is_training(&self) -> bool {
        self.dropout_mask.is_some()
    }
}

pub struct MagNet {
    propagator: Arc<ChebyshevPropagator>,
    convs: Vec<ChebConv>,
    head: ClassifierHead,
    spec: ModelSpec,
    rng: ChaCha8Rng,
}

impl MagNet {
    /// Fresh model. `seed = None` draws the generator from OS entropy.
    ///
    /// The generator drives initialization and, later, the dropout masks.
    pub fn new(
        propagator: Arc<ChebyshevPropagator>,
        spec: ModelSpec,
        seed: Option<u64>,
    ) -> MagNetResult<Self> {
        spec.validate()?;
        let mut rng = match seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };
        let k = propagator.order();
        let convs = (0..spec.layers)
            .map(|l| {
                let fan_in = if l == 0 { spec.in_features } else { spec.num_filter };
                ChebConv::new(k, fan_in, spec.num_filter, &mut rng)
            })
            .collect();
        let head = ClassifierHead::new(2 * spec.num_filter, spec.classes, &mut rng);
        log::debug!(
            "MagNet: {} layers, K={k}, F={}, classes={}",
            spec.layers,
            spec.num_filter,
            spec.classes
        );
        Ok(Self {
            propagator,
            convs,
            head,
            spec,
            rng,
        })
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn layers(&self) -> &[ChebConv] {
        &self.convs
    }

    pub fn head(&self) -> &ClassifierHead {
        &self.head
    }

    /// Training-mode pass: dropout active, draws from the model generator.
    pub fn forward_train(&mut self, x: &ComplexMatrix) -> MagNetResult<ForwardPass> {
        let mask = dropout_mask(
            x.nrows(),
            2 * self.spec.num_filter,
            self.spec.dropout,
            &mut self.rng,
        );
        self.run(x, Some(mask))
    }

    /// Evaluation-mode pass: no dropout, no state change.
    pub fn forward_eval(&self, x: &ComplexMatrix) -> MagNetResult<ForwardPass> {
        self.run(x, None)
    }

    fn run(&self, x: &ComplexMatrix, mask: Option<Array2<f64>>) -> MagNetResult<ForwardPass> {
        let mut layer_terms = Vec::with_capacity(self.convs.len());
        let mut pre_activations = Vec::with_capacity(self.convs.len());
        let mut signal: Option<ComplexMatrix> = None;

        for conv in &self.convs {
            let terms = self.propagator.propagate(signal.as_ref().unwrap_or(x))?;
            let z = conv.pre_activation(&terms)?;
            signal = Some(activation::forward(self.spec.activation, &z));
            layer_terms.push(terms);
            pre_activations.push(z);
        }
        let y = signal.ok_or_else(|| MagNetError::Config("model has no layers".to_string()))?;

        let mut head_input = y.concat_parts()?;
        if let Some(m) = &mask {
            head_input *= m;
        }
        let log_probs = self.head.classify(&head_input)?;
        Ok(ForwardPass {
            layer_terms,
            pre_activations,
            head_input,
            dropout_mask: mask,
            log_probs,
        })
    }

    /// Reverse pass from `∂loss/∂logits`; gradients in [`params`](Self::params) order.
    pub fn backward(
        &self,
        pass: &ForwardPass,
        grad_logits: &Array2<f64>,
    ) -> MagNetResult<Vec<Array2<f64>>> {
        if grad_logits.dim() != pass.log_probs.dim() {
            return Err(MagNetError::Shape(format!(
                "logit gradient {:?} vs output {:?}",
                grad_logits.dim(),
                pass.log_probs.dim()
            )));
        }
        let (grad_hw, grad_hb, mut grad_in) = self.head.backward(&pass.head_input, grad_logits);
        if let Some(m) = &pass.dropout_mask {
            grad_in *= m;
        }

        let mut grad_y = ComplexMatrix::split_parts(&grad_in)?;
        let mut layer_grads: Vec<ChebConvGrads> = Vec::with_capacity(self.convs.len());
        for l in (0..self.convs.len()).rev() {
            let grad_z =
                activation::backward(self.spec.activation, &pass.pre_activations[l], &grad_y);
            let (grads, grad_terms) = self.convs[l].backward(&pass.layer_terms[l], &grad_z)?;
            layer_grads.push(grads);
            if l > 0 {
                grad_y = self.propagator.adjoint(&grad_terms)?;
            }
        }
        layer_grads.reverse();

        let mut out = Vec::with_capacity(self.num_tensors());
        for g in layer_grads {
            for w in g.weights {
                out.push(w.re);
                out.push(w.im);
            }
            out.push(g.bias.re);
            out.push(g.bias.im);
        }
        out.push(grad_hw);
        out.push(grad_hb);
        Ok(out)
    }

    /// All parameter tensors in a fixed order.
    pub fn params(&self) -> Vec<&Array2<f64>> {
        let mut out = Vec::with_capacity(self.num_tensors());
        for conv in &self.convs {
            for w in &conv.weights {
                out.push(&w.re);
                out.push(&w.im);
            }
            out.push(&conv.bias.re);
            out.push(&conv.bias.im);
        }
        out.push(&self.head.weight);
        out.push(&self.head.bias);
        out
    }

    pub fn params_mut(&mut self) -> Vec<&mut Array2<f64>> {
        let mut out = Vec::with_capacity(self.num_tensors());
        for conv in &mut self.convs {
            for w in &mut conv.weights {
                out.push(&mut w.re);
                out.push(&mut w.im);
            }
            out.push(&mut conv.bias.re);
            out.push(&mut conv.bias.im);
        }
        out.push(&mut self.head.weight);
        out.push(&mut self.head.bias);
        out
    }

    fn num_tensors(&self) -> usize {
        self.convs.iter().map(|c| 2 * c.weights.len() + 2).sum::<usize>() + 2
    }

    /// Total scalar parameter count.
    pub fn num_parameters(&self) -> usize {
        self.params().iter().map(|p| p.len()).sum()
    }

    pub fn params_finite(&self) -> bool {
        self.non_finite_tensor().is_none()
    }

    /// Index (in [`params`](Self::params) order) of the first tensor holding NaN or ±∞.
    pub fn non_finite_tensor(&self) -> Option<usize> {
        self.params()
            .iter()
            .position(|p| p.iter().any(|v| !v.is_finite()))
    }

    /// Snapshot of the current parameters.
    pub fn checkpoint(&self, epoch: usize, val_loss: f64) -> Checkpoint {
        Checkpoint {
            epoch,
            val_loss,
            params: self.params().into_iter().cloned().collect(),
        }
    }

    /// Overwrite parameters from `ckpt`; rejects any shape disagreement.
    pub fn restore(&mut self, ckpt: &Checkpoint) -> MagNetResult<()> {
        let targets = self.params_mut();
        if targets.len() != ckpt.params.len() {
            return Err(MagNetError::Checkpoint(format!(
                "checkpoint holds {} tensors, model has {}",
                ckpt.params.len(),
                targets.len()
            )));
        }
        if let Some((i, (t, s))) = targets
            .iter()
            .zip(&ckpt.params)
            .enumerate()
            .find(|(_, (t, s))| t.dim() != s.dim())
        {
            return Err(MagNetError::Checkpoint(format!(
                "tensor {i}: checkpoint {:?}, model {:?}",
                s.dim(),
                t.dim()
            )));
        }
        for (t, s) in targets.into_iter().zip(&ckpt.params) {
            t.assign(s);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loss::{nll_logits_grad, nll_loss};
    use magnet_spectral::chebyshev::RescaledLaplacian;
    use magnet_spectral::spectral::estimate_lambda_max;
    use magnet_spectral::{DirectedGraph, MagneticLaplacian};
    use magnet_types::LaplacianNorm;

    fn propagator(k: usize) -> Arc<ChebyshevPropagator> {
        let g = DirectedGraph::from_edges(5, &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 0), (1, 3)])
            .unwrap();
        let lap = MagneticLaplacian::build(&g, 0.2, LaplacianNorm::Symmetric).unwrap();
        let lam = estimate_lambda_max(&lap).unwrap();
        Arc::new(ChebyshevPropagator::new(RescaledLaplacian::new(&lap, lam).unwrap(), k))
    }

    fn features() -> ComplexMatrix {
        ComplexMatrix::from_real_features(&Array2::from_shape_fn((5, 3), |(i, j)| {
            ((i * 3 + j) as f64 * 0.61).sin()
        }))
    }

    fn spec(layers: usize, activation: Activation) -> ModelSpec {
        ModelSpec {
            in_features: 3,
            num_filter: 4,
            layers,
            classes: 3,
            dropout: 0.0,
            activation,
        }
    }

    const LABELS: [usize; 5] = [0, 1, 2, 1, 0];
    const MASK: [usize; 3] = [0, 2, 3];

    fn loss_of(model: &MagNet, x: &ComplexMatrix) -> f64 {
        let pass = model.forward_eval(x).unwrap();
        nll_loss(pass.log_probs(), &LABELS, &MASK).unwrap()
    }

    #[test]
    fn test_seeded_init_is_reproducible() {
        let a = MagNet::new(propagator(1), spec(2, Activation::ComplexRelu), Some(42)).unwrap();
        let b = MagNet::new(propagator(1), spec(2, Activation::ComplexRelu), Some(42)).unwrap();
        let c = MagNet::new(propagator(1), spec(2, Activation::ComplexRelu), Some(43)).unwrap();
        assert_eq!(a.params(), b.params());
        assert_ne!(a.params(), c.params());
    }

    #[test]
    fn test_output_rows_are_distributions() {
        let model = MagNet::new(propagator(2), spec(2, Activation::ComplexRelu), Some(1)).unwrap();
        let pass = model.forward_eval(&features()).unwrap();
        assert_eq!(pass.log_probs().dim(), (5, 3));
        for row in pass.log_probs().rows() {
            let s: f64 = row.iter().map(|v| v.exp()).sum();
            assert!((s - 1.0).abs() < 1e-10);
        }
        assert!(!pass.is_training());
    }

    #[test]
    fn test_gradients_match_finite_differences() {
        // central differences on two entries of every tensor
        for act in [Activation::ComplexRelu, Activation::SplitRelu] {
            let mut model = MagNet::new(propagator(2), spec(2, act), Some(5)).unwrap();
            let x = features();
            let pass = model.forward_eval(&x).unwrap();
            let g = nll_logits_grad(pass.log_probs(), &LABELS, &MASK).unwrap();
            let grads = model.backward(&pass, &g).unwrap();
            assert_eq!(grads.len(), model.params().len());

            let h = 1e-6;
            for t in 0..grads.len() {
                let (rows, cols) = grads[t].dim();
                for idx in [(0, 0), (rows - 1, cols - 1)] {
                    model.params_mut()[t][idx] += h;
                    let up = loss_of(&model, &x);
                    model.params_mut()[t][idx] -= 2.0 * h;
                    let down = loss_of(&model, &x);
                    model.params_mut()[t][idx] += h;
                    let fd = (up - down) / (2.0 * h);
                    let an = grads[t][idx];
                    assert!(
                        (fd - an).abs() < 1e-5 * (1.0 + an.abs()),
                        "{act:?} tensor {t} {idx:?}: fd {fd} vs analytic {an}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_dropout_only_in_training() {
        let mut s = spec(1, Activation::ComplexRelu);
        s.dropout = 0.5;
        let mut model = MagNet::new(propagator(1), s, Some(3)).unwrap();
        let x = features();
        let e1 = model.forward_eval(&x).unwrap();
        let e2 = model.forward_eval(&x).unwrap();
        assert_eq!(e1.log_probs(), e2.log_probs());
        let t = model.forward_train(&x).unwrap();
        assert!(t.is_training());
    }

    #[test]
    fn test_checkpoint_restore() {
        let mut a = MagNet::new(propagator(1), spec(2, Activation::ComplexRelu), Some(1)).unwrap();
        let b = MagNet::new(propagator(1), spec(2, Activation::ComplexRelu), Some(2)).unwrap();
        a.restore(&b.checkpoint(7, 0.5)).unwrap();
        assert_eq!(a.params(), b.params());

        let other = MagNet::new(propagator(1), spec(1, Activation::ComplexRelu), Some(2)).unwrap();
        assert!(matches!(
            a.restore(&other.checkpoint(0, 0.0)),
            Err(MagNetError::Checkpoint(_))
        ));
    }

    #[test]
    fn test_parameter_count_and_non_finite_lookup() {
        let mut model = MagNet::new(propagator(1), spec(1, Activation::ComplexRelu), Some(8)).unwrap();
        // two orders × (re, im) × 3×4, bias 2 × 1×4, head 8×3 + 1×3
        assert_eq!(model.num_parameters(), 48 + 8 + 24 + 3);
        assert_eq!(model.non_finite_tensor(), None);

        model.params_mut()[3][[0, 0]] = f64::INFINITY;
        assert_eq!(model.non_finite_tensor(), Some(3));
        assert!(!model.params_finite());
    }

    #[test]
    fn test_invalid_spec() {
        let mut s = spec(0, Activation::ComplexRelu);
        assert!(MagNet::new(propagator(1), s.clone(), None).is_err());
        s.layers = 1;
        s.dropout = 1.0;
        assert!(MagNet::new(propagator(1), s, None).is_err());
    }
}
