// ─────────────────────────────────────────────────────────────────────
// MagNet — Adam Optimizer
// ─────────────────────────────────────────────────────────────────────
//! Adam with coupled L2 weight decay (`g ← g + λ·θ` before the moments).

use ndarray::{Array2, Zip};

use magnet_types::{MagNetError, MagNetResult};

pub const BETA1: f64 = 0.9;
pub const BETA2: f64 = 0.999;
pub const EPS: f64 = 1e-8;

#[derive(Debug, Clone)]
pub struct Adam {
    lr: f64,
    weight_decay: f64,
    step: i32,
    m: Vec<Array2<f64>>,
    v: Vec<Array2<f64>>,
}

impl Adam {
    /// Moment buffers shaped like `params`.
    pub fn new(params: &[&Array2<f64>], lr: f64, weight_decay: f64) -> Self {
        let zeros: Vec<Array2<f64>> = params.iter().map(|p| Array2::zeros(p.dim())).collect();
        Self {
            lr,
            weight_decay,
            step: 0,
            m: zeros.clone(),
            v: zeros,
        }
    }

    pub fn steps_taken(&self) -> i32 {
        self.step
    }

    /// One update. `params` and `grads` must follow the construction order.
    pub fn step(&mut self, params: Vec<&mut Array2<f64>>, grads: &[Array2<f64>]) -> MagNetResult<()> {
        if params.len() != self.m.len() || grads.len() != self.m.len() {
            return Err(MagNetError::Shape(format!(
                "optimizer tracks {} tensors, got {} params and {} grads",
                self.m.len(),
                params.len(),
                grads.len()
            )));
        }
        self.step += 1;
        let bc1 = 1.0 - BETA1.powi(self.step);
        let bc2 = 1.0 - BETA2.powi(self.step);
        let (lr, wd) = (self.lr, self.weight_decay);

        for (((p, g), m), v) in params
            .into_iter()
            .zip(grads)
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
        {
            if p.dim() != g.dim() || p.dim() != m.dim() {
                return Err(MagNetError::Shape(format!(
                    "parameter {:?} vs gradient {:?}",
                    p.dim(),
                    g.dim()
                )));
            }
            Zip::from(p).and(g).and(m).and(v).for_each(|p, &g, m, v| {
                let g = g + wd * *p;
                *m = BETA1 * *m + (1.0 - BETA1) * g;
                *v = BETA2 * *v + (1.0 - BETA2) * g * g;
                let m_hat = *m / bc1;
                let v_hat = *v / bc2;
                *p -= lr * m_hat / (v_hat.sqrt() + EPS);
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_first_step_moves_by_lr() {
        // bias-corrected first step is ±lr regardless of gradient scale
        let mut p = array![[1.0, -2.0]];
        let mut opt = Adam::new(&[&p], 0.1, 0.0);
        opt.step(vec![&mut p], &[array![[5.0, -0.01]]]).unwrap();
        assert!((p[[0, 0]] - 0.9).abs() < 1e-6);
        assert!((p[[0, 1]] + 1.9).abs() < 1e-4);
        assert_eq!(opt.steps_taken(), 1);
    }

    #[test]
    fn test_minimizes_quadratic() {
        let mut p = array![[3.0, -4.0]];
        let mut opt = Adam::new(&[&p], 0.05, 0.0);
        for _ in 0..2000 {
            let g = p.mapv(|x| 2.0 * x);
            opt.step(vec![&mut p], &[g]).unwrap();
        }
        assert!(p.iter().all(|v| v.abs() < 5e-2), "{p}");
    }

    #[test]
    fn test_weight_decay_shrinks_without_gradient() {
        let mut p = array![[1.0]];
        let mut opt = Adam::new(&[&p], 0.01, 0.5);
        opt.step(vec![&mut p], &[array![[0.0]]]).unwrap();
        assert!(p[[0, 0]] < 1.0);
    }

    #[test]
    fn test_length_mismatch() {
        let mut p = array![[1.0]];
        let mut opt = Adam::new(&[&p], 0.01, 0.0);
        assert!(opt.step(vec![&mut p], &[]).is_err());
    }
}
