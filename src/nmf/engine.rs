//! Multiplicative-update NMF (Lee & Seung).

use super::{NmfConfig, NmfResult};
use crate::error::{NicheError, Result};
use crate::rng::{uniform, RandomSource};
use nalgebra::DMatrix;

/// Added to every update denominator.
pub const NMF_EPSILON: f64 = 1e-10;

/// Factor a non-negative matrix `V ≈ W H`.
///
/// `V` is taxa × samples; `W` comes back taxa × k and `H` k × samples.
/// `W` is filled first, then `H`, each row by row from the RNG, scaled by
/// `sqrt(mean(V) / k)`. Updates alternate `H ← H ⊙ (WᵀV) ⊘ (WᵀWH + ε)` and
/// `W ← W ⊙ (VHᵀ) ⊘ (WHHᵀ + ε)` until the relative change of the Frobenius
/// residual drops below `tolerance` or `max_iterations` is spent.
///
/// Running out of iterations is not an error; the result reports
/// `converged = false` with the residual reached. `k == 0` or an empty `V`
/// give an empty result.
///
/// # Errors
/// Negative or non-finite entries in `V`.
pub fn nmf<R: RandomSource + ?Sized>(
    v: &DMatrix<f64>,
    config: &NmfConfig,
    rng: &mut R,
) -> Result<NmfResult> {
    let (n_rows, n_cols) = v.shape();
    let k = config.k;
    if k == 0 || n_rows == 0 || n_cols == 0 {
        return Ok(NmfResult::empty());
    }
    if let Some(bad) = v.iter().find(|x| !x.is_finite() || **x < 0.0) {
        return Err(NicheError::InvalidParameter(format!(
            "NMF input must be non-negative and finite, found {}",
            bad
        )));
    }

    let mean = v.mean();
    let scale = if mean > 0.0 { (mean / k as f64).sqrt() } else { 1.0 };

    let mut w = DMatrix::<f64>::zeros(n_rows, k);
    for i in 0..n_rows {
        for c in 0..k {
            w[(i, c)] = uniform(rng) * scale;
        }
    }
    let mut h = DMatrix::<f64>::zeros(k, n_cols);
    for c in 0..k {
        for j in 0..n_cols {
            h[(c, j)] = uniform(rng) * scale;
        }
    }

    let mut error = reconstruction_error(v, &w, &h);
    let mut iterations = 0;
    let mut converged = false;

    for iter in 0..config.max_iterations {
        let wt = w.transpose();
        let numer = &wt * v;
        let denom = (&wt * &w * &h).add_scalar(NMF_EPSILON);
        h.component_mul_assign(&numer);
        h.component_div_assign(&denom);

        let ht = h.transpose();
        let numer = v * &ht;
        let denom = (&w * (&h * &ht)).add_scalar(NMF_EPSILON);
        w.component_mul_assign(&numer);
        w.component_div_assign(&denom);

        let new_error = reconstruction_error(v, &w, &h);
        iterations = iter + 1;
        let change = if error > 0.0 {
            (error - new_error).abs() / error
        } else {
            0.0
        };
        error = new_error;
        if change < config.tolerance {
            converged = true;
            break;
        }
    }

    if converged {
        log::debug!("NMF k={} converged after {} iterations (error {:.6})", k, iterations, error);
    } else {
        log::debug!("NMF k={} stopped at iteration budget {} (error {:.6})", k, iterations, error);
    }

    Ok(NmfResult {
        w,
        h,
        error,
        k,
        iterations,
        converged,
    })
}

/// Frobenius norm of `V - W H`.
pub fn reconstruction_error(v: &DMatrix<f64>, w: &DMatrix<f64>, h: &DMatrix<f64>) -> f64 {
    (v - w * h).norm()
}
