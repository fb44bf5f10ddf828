// ─────────────────────────────────────────────────────────────────────
// MagNet — Complex Activations
// ─────────────────────────────────────────────────────────────────────
//! Nonlinearities on paired real/imaginary blocks and their derivatives.

use magnet_spectral::ComplexMatrix;
use magnet_types::Activation;

/// Apply `act` to the pre-activation `z`.
pub fn forward(act: Activation, z: &ComplexMatrix) -> ComplexMatrix {
    match act {
        Activation::ComplexRelu => {
            let mut out = z.clone();
            out.im.zip_mut_with(&z.re, |v, &r| {
                if r < 0.0 {
                    *v = 0.0
                }
            });
            out.re.mapv_inplace(|r| if r < 0.0 { 0.0 } else { r });
            out
        }
        Activation::SplitRelu => ComplexMatrix {
            re: z.re.mapv(|v| v.max(0.0)),
            im: z.im.mapv(|v| v.max(0.0)),
        },
    }
}

/// Gradient w.r.t. the pre-activation given the gradient w.r.t. the output.
pub fn backward(act: Activation, z: &ComplexMatrix, grad_out: &ComplexMatrix) -> ComplexMatrix {
    let mut g = grad_out.clone();
    match act {
        Activation::ComplexRelu => {
            g.re.zip_mut_with(&z.re, |v, &r| {
                if r < 0.0 {
                    *v = 0.0
                }
            });
            g.im.zip_mut_with(&z.re, |v, &r| {
                if r < 0.0 {
                    *v = 0.0
                }
            });
        }
        Activation::SplitRelu => {
            g.re.zip_mut_with(&z.re, |v, &r| {
                if r <= 0.0 {
                    *v = 0.0
                }
            });
            g.im.zip_mut_with(&z.im, |v, &i| {
                if i <= 0.0 {
                    *v = 0.0
                }
            });
        }
    }
    g
}
