// ─────────────────────────────────────────────────────────────────────
// MagNet — Complex Chebyshev Convolution
// ─────────────────────────────────────────────────────────────────────
//! One spectral convolution layer over precomputed Chebyshev terms:
//!
//!   Z = Σ_k T_k · W_k + b        (complex, T_k: N×F_in, W_k: F_in×F_out)
//!
//! expanded into real products:
//!
//!   Z_re = Σ_k T_re W_re − T_im W_im + b_re
//!   Z_im = Σ_k T_re W_im + T_im W_re + b_im
//!
//! The nonlinearity is applied by the caller (see [`crate::activation`]).

use ndarray::{Array2, Axis};
use rand::Rng;

use magnet_spectral::ComplexMatrix;
use magnet_types::{Activation, MagNetError, MagNetResult};

use crate::activation;

/// Learnable parameters of one convolution layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ChebConv {
    /// `K+1` complex weights, each `F_in × F_out`.
    pub weights: Vec<ComplexMatrix>,
    /// Complex bias, `1 × F_out`.
    pub bias: ComplexMatrix,
}

/// Parameter gradients of one layer, same layout as [`ChebConv`].
#[derive(Debug, Clone)]
pub struct ChebConvGrads {
    pub weights: Vec<ComplexMatrix>,
    pub bias: ComplexMatrix,
}

impl ChebConv {
    /// Weights uniform in `±1/sqrt(F_out)`, bias zero.
    pub fn new<R: Rng>(k: usize, in_features: usize, out_features: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (out_features as f64).sqrt();
        let mut draw = || {
            Array2::from_shape_fn((in_features, out_features), |_| {
                rng.gen_range(-bound..=bound)
            })
        };
        let weights = (0..=k)
            .map(|_| {
                let re = draw();
                let im = draw();
                ComplexMatrix { re, im }
            })
            .collect();
        Self {
            weights,
            bias: ComplexMatrix::zeros(1, out_features),
        }
    }

    pub fn order(&self) -> usize {
        self.weights.len() - 1
    }

    pub fn in_features(&self) -> usize {
        self.weights[0].nrows()
    }

    pub fn out_features(&self) -> usize {
        self.weights[0].ncols()
    }

    fn check_terms(&self, terms: &[ComplexMatrix]) -> MagNetResult<()> {
        if terms.len() != self.weights.len() {
            return Err(MagNetError::Shape(format!(
                "layer expects {} Chebyshev terms, got {}",
                self.weights.len(),
                terms.len()
            )));
        }
        if let Some(t) = terms.iter().find(|t| t.ncols() != self.in_features()) {
            return Err(MagNetError::Shape(format!(
                "layer expects {} input channels, got {}",
                self.in_features(),
                t.ncols()
            )));
        }
        Ok(())
    }

    /// Pre-activation `Z = Σ_k T_k W_k + b`.
    pub fn pre_activation(&self, terms: &[ComplexMatrix]) -> MagNetResult<ComplexMatrix> {
        self.check_terms(terms)?;
        let mut z = ComplexMatrix::zeros(terms[0].nrows(), self.out_features());
        for (t, w) in terms.iter().zip(&self.weights) {
            z.scaled_add(1.0, &t.matmul(w));
        }
        z.re += &self.bias.re;
        z.im += &self.bias.im;
        Ok(z)
    }

    /// Layer output `act(Z)`.
    pub fn forward(&self, terms: &[ComplexMatrix], act: Activation) -> MagNetResult<ComplexMatrix> {
        Ok(activation::forward(act, &self.pre_activation(terms)?))
    }

    /// Reverse pass given `∂loss/∂Z`.
    ///
    /// Returns the parameter gradients and `∂loss/∂T_k` for every order.
    pub fn backward(
        &self,
        terms: &[ComplexMatrix],
        grad_z: &ComplexMatrix,
    ) -> MagNetResult<(ChebConvGrads, Vec<ComplexMatrix>)> {
        self.check_terms(terms)?;
        let mut grad_w = Vec::with_capacity(self.weights.len());
        let mut grad_t = Vec::with_capacity(self.weights.len());
        for (t, w) in terms.iter().zip(&self.weights) {
            // dW_re =  T_reᵀ G_re + T_imᵀ G_im
            // dW_im = −T_imᵀ G_re + T_reᵀ G_im
            grad_w.push(ComplexMatrix {
                re: t.re.t().dot(&grad_z.re) + t.im.t().dot(&grad_z.im),
                im: t.re.t().dot(&grad_z.im) - t.im.t().dot(&grad_z.re),
            });
            // dT_re =  G_re W_reᵀ + G_im W_imᵀ
            // dT_im = −G_re W_imᵀ + G_im W_reᵀ
            grad_t.push(ComplexMatrix {
                re: grad_z.re.dot(&w.re.t()) + grad_z.im.dot(&w.im.t()),
                im: grad_z.im.dot(&w.re.t()) - grad_z.re.dot(&w.im.t()),
            });
        }
        let bias = ComplexMatrix {
            re: grad_z.re.sum_axis(Axis(0)).insert_axis(Axis(0)),
            im: grad_z.im.sum_axis(Axis(0)).insert_axis(Axis(0)),
        };
        Ok((
            ChebConvGrads {
                weights: grad_w,
                bias,
            },
            grad_t,
        ))
    }
}
