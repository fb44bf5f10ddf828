// ─────────────────────────────────────────────────────────────────────
// MagNet — Spectral Radius of the Magnetic Laplacian
// ─────────────────────────────────────────────────────────────────────
//! λ_max for the Chebyshev rescaling `L̃ = 2L/λ_max − I`.
//!
//! Small graphs get the exact spectrum from a cyclic Jacobi solve of the
//! real 2N×2N embedding `[[Re, −Im], [Im, Re]]` (every Hermitian
//! eigenvalue appears twice). Larger graphs use Lanczos with full
//! reorthogonalisation, driven by sparse products, and return an upper
//! bound: the top Ritz value plus its residual norm, or the Gershgorin
//! bound when the iteration does not converge.

use magnet_types::{LambdaMax, MagNetError, MagNetResult};

use crate::complex::ComplexMatrix;
use crate::laplacian::MagneticLaplacian;

/// Node count up to which λ_max is taken from the exact spectrum.
pub const EXACT_SPECTRUM_MAX_NODES: usize = 64;

const LANCZOS_MAX_STEPS: usize = 256;
/// Relative Ritz residual at which the top Ritz value is accepted.
const LANCZOS_TOL: f64 = 1e-8;

/// Relative slack allowed when a fixed λ_max is checked against the estimate.
const LAMBDA_CHECK_SLACK: f64 = 1e-6;

/// Estimate the largest eigenvalue of the (positive semi-definite) Laplacian.
///
/// The result is never below the true λ_max, so `2L/λ_max − I` keeps its
/// spectrum inside [−1, 1].
pub fn estimate_lambda_max(lap: &MagneticLaplacian) -> MagNetResult<f64> {
    let n = lap.num_nodes();
    if n <= EXACT_SPECTRUM_MAX_NODES {
        let eigvals = hermitian_eigenvalues(lap)?;
        return Ok(eigvals.last().copied().unwrap_or(0.0).max(0.0));
    }
    lanczos_upper_bound(lap)
}

/// Lanczos on the Hermitian operator with a deterministic start vector.
///
/// The top Ritz value θ never exceeds λ_max, and the eigenvalue it
/// approximates lies within the Ritz residual ρ, so `θ + ρ` bounds λ_max
/// from above once the pair has converged.
fn lanczos_upper_bound(lap: &MagneticLaplacian) -> MagNetResult<f64> {
    let n = lap.num_nodes();
    let bound = gershgorin_bound(lap);
    if bound == 0.0 {
        return Ok(0.0);
    }

    // Low-discrepancy start, never orthogonal to a whole eigenspace in practice.
    let mut v = ComplexMatrix::zeros(n, 1);
    for i in 0..n {
        v.re[[i, 0]] = ((i as f64 + 1.0) * 0.618_033_988_749_895).fract() - 0.5;
        v.im[[i, 0]] = ((i as f64 + 1.0) * 0.414_213_562_373_095).fract() - 0.5;
    }
    normalise(&mut v);

    let max_steps = LANCZOS_MAX_STEPS.min(2 * n);
    let mut basis: Vec<ComplexMatrix> = Vec::with_capacity(max_steps);
    let mut alpha: Vec<f64> = Vec::with_capacity(max_steps);
    let mut beta: Vec<f64> = Vec::with_capacity(max_steps);

    for step in 0..max_steps {
        let mut w = v.apply_sparse(&lap.real, &lap.imag)?;
        let a = dot(&v, &w);
        if !a.is_finite() {
            return Err(MagNetError::Numerical(format!(
                "Lanczos produced {a} at step {step}"
            )));
        }
        w.scaled_add(-a, &v);
        if let (Some(prev), Some(&b)) = (basis.last(), beta.last()) {
            w.scaled_add(-b, prev);
        }
        basis.push(v);
        // two Gram-Schmidt passes keep the basis orthogonal to working precision
        for _ in 0..2 {
            for q in &basis {
                let c = dot(q, &w);
                w.scaled_add(-c, q);
            }
        }
        alpha.push(a);

        let b = normalise(&mut w);
        let (theta, last) = top_ritz(&alpha, &beta);
        let residual = b * last.abs();
        if residual <= LANCZOS_TOL * theta.abs().max(1.0) {
            log::debug!(
                "Lanczos converged after {} steps: θ = {theta:.12}, ρ = {residual:.3e}",
                step + 1
            );
            return Ok((theta + residual).clamp(0.0, bound));
        }
        beta.push(b);
        v = w;
    }
    log::warn!(
        "Lanczos did not converge in {max_steps} steps; using the Gershgorin bound {bound:.6}"
    );
    Ok(bound)
}

fn dot(a: &ComplexMatrix, b: &ComplexMatrix) -> f64 {
    a.re.iter()
        .zip(b.re.iter())
        .chain(a.im.iter().zip(b.im.iter()))
        .map(|(x, y)| x * y)
        .sum()
}

/// Scale to unit norm; returns the norm before scaling.
fn normalise(v: &mut ComplexMatrix) -> f64 {
    let norm = dot(v, v).sqrt();
    if norm > 0.0 {
        v.re.mapv_inplace(|x| x / norm);
        v.im.mapv_inplace(|x| x / norm);
    }
    norm
}

/// Largest eigenvalue of the symmetric tridiagonal matrix with diagonal `d`
/// and off-diagonal `e`, and the last entry of its unit eigenvector.
fn top_ritz(d: &[f64], e: &[f64]) -> (f64, f64) {
    let m = d.len();
    let off = |i: usize| -> f64 {
        let below = if i > 0 { e[i - 1].abs() } else { 0.0 };
        below + e.get(i).map_or(0.0, |v| v.abs())
    };
    let mut lo = (0..m).map(|i| d[i] - off(i)).fold(f64::INFINITY, f64::min);
    let mut hi = (0..m).map(|i| d[i] + off(i)).fold(f64::NEG_INFINITY, f64::max);

    // Bisection on the Sturm count keeps every eigenvalue at or below `hi`.
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if mid <= lo || mid >= hi {
            break;
        }
        if sturm_count(d, e, mid) == m {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    // Inverse iteration just above the top: T − σI is negative definite.
    let sigma = hi + 1e-10 * hi.abs().max(1.0);
    let mut x = vec![1.0; m];
    for _ in 0..3 {
        x = solve_shifted(d, e, sigma, &x);
        let norm = x.iter().map(|v| v * v).sum::<f64>().sqrt();
        if !norm.is_finite() || norm == 0.0 {
            // |x_last| ≤ 1 always, so 1 overstates the residual
            return (hi, 1.0);
        }
        x.iter_mut().for_each(|v| *v /= norm);
    }
    (hi, x[m - 1])
}

/// Number of eigenvalues of the tridiagonal matrix below `x`.
fn sturm_count(d: &[f64], e: &[f64], x: f64) -> usize {
    let mut count = 0;
    let mut q = 1.0;
    for i in 0..d.len() {
        let coupling = if i > 0 { e[i - 1] * e[i - 1] / q } else { 0.0 };
        q = d[i] - x - coupling;
        if q == 0.0 {
            q = -f64::EPSILON * (d[i].abs() + x.abs()).max(f64::MIN_POSITIVE);
        }
        if q < 0.0 {
            count += 1;
        }
    }
    count
}

/// Solve `(T − σI) x = rhs` by forward elimination and back substitution.
fn solve_shifted(d: &[f64], e: &[f64], sigma: f64, rhs: &[f64]) -> Vec<f64> {
    let m = d.len();
    let mut c = vec![0.0; m];
    let mut y = vec![0.0; m];
    for i in 0..m {
        let (sub, prev_c, prev_y) = if i > 0 {
            (e[i - 1], c[i - 1], y[i - 1])
        } else {
            (0.0, 0.0, 0.0)
        };
        let mut denom = d[i] - sigma - sub * prev_c;
        if denom == 0.0 {
            denom = -f64::EPSILON * sigma.abs().max(1.0);
        }
        c[i] = e.get(i).map_or(0.0, |v| v / denom);
        y[i] = (rhs[i] - sub * prev_y) / denom;
    }
    let mut x = y;
    for i in (0..m.saturating_sub(1)).rev() {
        x[i] -= c[i] * x[i + 1];
    }
    x
}

/// Gershgorin upper bound on the spectral radius: `max_i Σ_j |L_ij|`.
pub fn gershgorin_bound(lap: &MagneticLaplacian) -> f64 {
    let n = lap.num_nodes();
    (0..n)
        .map(|i| {
            let re = &lap.real;
            let im = &lap.imag;
            let mut sum = 0.0;
            for p in re.row_ptr[i]..re.row_ptr[i + 1] {
                let j = re.col_idx[p];
                sum += re.values[p].hypot(im.get(i, j));
            }
            // imaginary entries whose real part cancelled to zero
            for p in im.row_ptr[i]..im.row_ptr[i + 1] {
                if re.get(i, im.col_idx[p]) == 0.0 {
                    sum += im.values[p].abs();
                }
            }
            sum
        })
        .fold(0.0, f64::max)
}

/// Resolve the configured λ_max against the Laplacian.
///
/// A fixed value below the estimated spectral radius would push the
/// rescaled spectrum outside [−1, 1] and make the recursion diverge, so it
/// is rejected. A zero operator uses scale 1.
pub fn resolve_lambda_max(lap: &MagneticLaplacian, choice: LambdaMax) -> MagNetResult<f64> {
    let estimate = estimate_lambda_max(lap)?;
    match choice {
        LambdaMax::Estimated => {
            if estimate < 1e-12 {
                log::warn!("Laplacian has no spectrum away from zero; using λ_max = 1");
                Ok(1.0)
            } else {
                log::debug!("λ_max estimated at {estimate:.6}");
                Ok(estimate)
            }
        }
        LambdaMax::Fixed(v) => {
            if !v.is_finite() || v <= 0.0 {
                return Err(MagNetError::Numerical(format!(
                    "λ_max must be positive and finite, got {v}"
                )));
            }
            if v < estimate * (1.0 - LAMBDA_CHECK_SLACK) {
                return Err(MagNetError::Numerical(format!(
                    "fixed λ_max = {v} is below the spectral radius estimate {estimate:.6}"
                )));
            }
            Ok(v)
        }
    }
}

/// All eigenvalues of the Hermitian Laplacian, ascending.
pub fn hermitian_eigenvalues(lap: &MagneticLaplacian) -> MagNetResult<Vec<f64>> {
    let n = lap.num_nodes();
    if n > 4 * EXACT_SPECTRUM_MAX_NODES {
        return Err(MagNetError::InvalidParameter(format!(
            "exact spectrum limited to {} nodes, got {n}",
            4 * EXACT_SPECTRUM_MAX_NODES
        )));
    }
    let m = 2 * n;
    let mut a = vec![0.0; m * m];
    for (i, j, v) in lap.real.triplets() {
        a[i * m + j] = v;
        a[(i + n) * m + (j + n)] = v;
    }
    for (i, j, v) in lap.imag.triplets() {
        a[i * m + (j + n)] = -v;
        a[(i + n) * m + j] = v;
    }

    let mut eig = vec![0.0; m];
    jacobi_eigenvalues_symmetric(&mut a, m, &mut eig);
    eig.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));
    // Each eigenvalue of the embedding is doubled.
    Ok(eig.into_iter().step_by(2).collect())
}

/// Cyclic Jacobi eigenvalues for a symmetric m×m matrix.
///
/// `a` is m×m row-major and is destroyed; its diagonal ends up holding the eigenvalues.
/// `eigvals_out` receives the m eigenvalues (unsorted).
fn jacobi_eigenvalues_symmetric(a: &mut [f64], m: usize, eigvals_out: &mut [f64]) {
    const MAX_SWEEPS: usize = 60;
    const TOL: f64 = 1e-14;

    for sweep in 0..MAX_SWEEPS {
        let mut max_off: f64 = 0.0;
        for p in 0..m {
            for q in (p + 1)..m {
                max_off = max_off.max(a[p * m + q].abs());
            }
        }
        if max_off < TOL {
            break;
        }

        let threshold = if sweep < 4 {
            0.2 * max_off / (m * m) as f64
        } else {
            0.0
        };

        for p in 0..m {
            for q in (p + 1)..m {
                let apq = a[p * m + q];
                if apq.abs() < threshold || apq == 0.0 {
                    continue;
                }

                let app = a[p * m + p];
                let aqq = a[q * m + q];
                let diff = aqq - app;

                let t = if diff.abs() < 1e-300 {
                    apq.signum()
                } else {
                    let theta = diff / (2.0 * apq);
                    let sign = if theta >= 0.0 { 1.0 } else { -1.0 };
                    sign / (theta.abs() + (1.0 + theta * theta).sqrt())
                };

                let c = 1.0 / (1.0 + t * t).sqrt();
                let s = t * c;
                let tau_rot = s / (1.0 + c);

                a[p * m + p] -= t * apq;
                a[q * m + q] += t * apq;
                a[p * m + q] = 0.0;
                a[q * m + p] = 0.0;

                for r in 0..m {
                    if r == p || r == q {
                        continue;
                    }
                    let arp = a[r * m + p];
                    let arq = a[r * m + q];
                    a[r * m + p] = arp - s * (arq + tau_rot * arp);
                    a[p * m + r] = a[r * m + p];
                    a[r * m + q] = arq + s * (arp - tau_rot * arq);
                    a[q * m + r] = a[r * m + q];
                }
            }
        }
    }

    for i in 0..m {
        eigvals_out[i] = a[i * m + i];
    }
}
