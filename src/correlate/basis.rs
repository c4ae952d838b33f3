//! Log-ratio variances and compositional basis variances.
//!
//! For compositional data the variance of a pairwise log-ratio decomposes as
//! `T_ij = ω_i² + ω_j² - 2 ρ_ij ω_i ω_j`, where `ω_i²` is the (unobserved)
//! variance of taxon i's log basis abundance. Assuming most pairs are
//! uncorrelated, summing over partners gives a linear system for the `ω²`
//! that this module solves in the least-squares sense.

use crate::error::{NicheError, Result};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

/// Singular values below this are treated as zero in the least-squares solve.
const SVD_EPS: f64 = 1e-12;

/// Unbiased sample variance. Zero for fewer than two values.
pub fn sample_variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (ss / (n - 1) as f64).max(0.0)
}

/// Variance of each pairwise log-ratio across samples.
///
/// `T_ij = var(CLR_i - CLR_j)`, which equals `var(ln(x_i / x_j))` because
/// CLR only shifts each row by a constant. The result is symmetric with a
/// zero diagonal.
pub fn log_ratio_variances(clr: &DMatrix<f64>) -> DMatrix<f64> {
    let (n_taxa, n_samples) = clr.shape();

    let upper: Vec<Vec<f64>> = (0..n_taxa)
        .into_par_iter()
        .map(|i| {
            let mut diff = vec![0.0; n_samples];
            (i + 1..n_taxa)
                .map(|j| {
                    for (s, d) in diff.iter_mut().enumerate() {
                        *d = clr[(i, s)] - clr[(j, s)];
                    }
                    sample_variance(&diff)
                })
                .collect()
        })
        .collect();

    let mut t = DMatrix::zeros(n_taxa, n_taxa);
    for (i, row) in upper.iter().enumerate() {
        for (offset, &v) in row.iter().enumerate() {
            let j = i + 1 + offset;
            t[(i, j)] = v;
            t[(j, i)] = v;
        }
    }
    t
}

/// Solve for per-taxon basis variances from pairwise log-ratio variances.
///
/// Builds `M ω² = t` with `t_i = Σ_{j included} T_ij`, `M_ii` the number of
/// included partners of i and `M_ij = 1` for included pairs, then solves by
/// SVD pseudo-inverse. Pairs flagged in `excluded` (symmetric) are left out
/// of both sides, which is how strongly correlated pairs stop biasing the
/// estimate. Negative solutions are clamped to zero.
///
/// With two taxa the system is singular and the minimum-norm solution splits
/// the single log-ratio variance evenly.
pub fn basis_variances(t: &DMatrix<f64>, excluded: Option<&DMatrix<bool>>) -> Result<Vec<f64>> {
    let d = t.nrows();
    if t.ncols() != d {
        return Err(NicheError::DimensionMismatch {
            expected: d,
            actual: t.ncols(),
        });
    }
    if let Some(mask) = excluded {
        if mask.shape() != (d, d) {
            return Err(NicheError::DimensionMismatch {
                expected: d,
                actual: mask.nrows(),
            });
        }
    }
    if d < 2 {
        return Ok(vec![0.0; d]);
    }

    let is_included = |i: usize, j: usize| i != j && excluded.map_or(true, |m| !m[(i, j)]);

    let mut m = DMatrix::<f64>::zeros(d, d);
    let mut rhs = DVector::<f64>::zeros(d);
    for i in 0..d {
        for j in 0..d {
            if is_included(i, j) {
                m[(i, j)] = 1.0;
                m[(i, i)] += 1.0;
                rhs[i] += t[(i, j)];
            }
        }
    }

    let svd = m.svd(true, true);
    let solution = svd
        .solve(&rhs, SVD_EPS)
        .map_err(|e| NicheError::Numerical(format!("Basis variance solve failed: {}", e)))?;

    Ok(solution
        .iter()
        .map(|&v| if v.is_finite() && v > 0.0 { v } else { 0.0 })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn uncorrelated_t(omega: &[f64]) -> DMatrix<f64> {
        let d = omega.len();
        DMatrix::from_fn(d, d, |i, j| if i == j { 0.0 } else { omega[i] + omega[j] })
    }

    #[test]
    fn test_sample_variance() {
        assert_relative_eq!(sample_variance(&[1.0, 2.0, 3.0, 4.0]), 1.6666666666, epsilon = 1e-9);
        assert_eq!(sample_variance(&[5.0]), 0.0);
        assert_eq!(sample_variance(&[]), 0.0);
    }

    #[test]
    fn test_log_ratio_variances_symmetric() {
        let clr = DMatrix::from_row_slice(3, 4, &[
            0.5, -0.5, 1.0, -1.0,
            0.2, 0.1, -0.1, -0.2,
            -0.7, 0.4, -0.9, 1.2,
        ]);
        let t = log_ratio_variances(&clr);
        for i in 0..3 {
            assert_eq!(t[(i, i)], 0.0);
            for j in 0..3 {
                assert_eq!(t[(i, j)], t[(j, i)]);
                assert!(t[(i, j)] >= 0.0);
            }
        }
        let diff: Vec<f64> = (0..4).map(|s| clr[(0, s)] - clr[(1, s)]).collect();
        assert_relative_eq!(t[(0, 1)], sample_variance(&diff), epsilon = 1e-12);
    }

    #[test]
    fn test_basis_variances_recovers_uncorrelated() {
        let omega = [1.0, 2.0, 3.0, 4.0, 0.5];
        let solved = basis_variances(&uncorrelated_t(&omega), None).unwrap();
        for (expected, actual) in omega.iter().zip(&solved) {
            assert_relative_eq!(*expected, *actual, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_basis_variances_with_exclusion() {
        let omega = [1.0, 2.0, 3.0, 4.0, 0.5, 1.5];
        let mut t = uncorrelated_t(&omega);
        // Taxa 0 and 1 perfectly correlated: the log-ratio variance collapses.
        let rho = 1.0;
        let v = omega[0] + omega[1] - 2.0 * rho * (omega[0] * omega[1]).sqrt();
        t[(0, 1)] = v;
        t[(1, 0)] = v;

        let mut mask = DMatrix::from_element(6, 6, false);
        mask[(0, 1)] = true;
        mask[(1, 0)] = true;
        let solved = basis_variances(&t, Some(&mask)).unwrap();
        for (expected, actual) in omega.iter().zip(&solved) {
            assert_relative_eq!(*expected, *actual, epsilon = 1e-9);
        }

        // Without the exclusion the correlated pair drags the estimate down.
        let biased = basis_variances(&t, None).unwrap();
        assert!(biased[0] < omega[0]);
    }

    #[test]
    fn test_basis_variances_two_taxa_split() {
        let t = DMatrix::from_row_slice(2, 2, &[0.0, 3.0, 3.0, 0.0]);
        let solved = basis_variances(&t, None).unwrap();
        assert_relative_eq!(solved[0], 1.5, epsilon = 1e-9);
        assert_relative_eq!(solved[1], 1.5, epsilon = 1e-9);
    }

    #[test]
    fn test_basis_variances_degenerate() {
        assert!(basis_variances(&DMatrix::zeros(0, 0), None).unwrap().is_empty());
        assert_eq!(basis_variances(&DMatrix::zeros(1, 1), None).unwrap(), vec![0.0]);
        let zeros = basis_variances(&DMatrix::zeros(4, 4), None).unwrap();
        assert!(zeros.iter().all(|&v| v == 0.0));
        assert!(basis_variances(&DMatrix::zeros(2, 3), None).is_err());
    }
}
