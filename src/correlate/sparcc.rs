//! Compositionally corrected (SparCC-style) correlation between taxa.

use super::basis::{basis_variances, log_ratio_variances, sample_variance};
use crate::error::Result;
use crate::rng::{bootstrap_indices, RandomSource};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Variances at or below this are treated as zero.
pub const ZERO_VARIANCE: f64 = 1e-12;

/// Taxa keep at least this many included partners during pair exclusion.
const MIN_PARTNERS: usize = 3;

/// How pairwise correlations are estimated from CLR data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrelationMethod {
    /// Basis correlation corrected for the sum-to-one constraint.
    Basis,
    /// Plain Pearson correlation of CLR rows (biased baseline).
    Pearson,
}

/// Configuration for the basis correlation estimator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasisCorrelationConfig {
    /// Estimation method.
    pub method: CorrelationMethod,
    /// Number of estimation passes. Pass 0 uses the full data, the rest use
    /// bootstrap resamples of the samples; the element-wise median is kept.
    pub iterations: usize,
    /// Maximum number of strongly correlated pairs excluded per pass.
    pub exclusion_iterations: usize,
    /// Pairs with |correlation| above this are candidates for exclusion.
    pub exclusion_threshold: f64,
}

impl Default for BasisCorrelationConfig {
    fn default() -> Self {
        Self {
            method: CorrelationMethod::Basis,
            iterations: 10,
            exclusion_iterations: 10,
            exclusion_threshold: 0.1,
        }
    }
}

impl BasisCorrelationConfig {
    /// Set the estimation method.
    pub fn with_method(mut self, method: CorrelationMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the number of estimation passes.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set pair exclusion parameters.
    pub fn with_exclusion(mut self, iterations: usize, threshold: f64) -> Self {
        self.exclusion_iterations = iterations;
        self.exclusion_threshold = threshold;
        self
    }
}

/// Estimate the taxon × taxon correlation matrix from CLR rows.
///
/// Rows of `clr` are taxa, columns samples. The result is symmetric with a
/// unit diagonal and entries in [-1, 1]; fewer than two taxa yield a 0×0
/// matrix. Taxa without variance correlate 0 with everything else.
///
/// The RNG is only consumed for bootstrap passes (`iterations > 1` with the
/// basis method): one index draw per sample per pass.
pub fn basis_correlation<R: RandomSource + ?Sized>(
    clr: &DMatrix<f64>,
    config: &BasisCorrelationConfig,
    rng: &mut R,
) -> Result<DMatrix<f64>> {
    let (n_taxa, n_samples) = clr.shape();
    if n_taxa < 2 {
        return Ok(DMatrix::zeros(0, 0));
    }
    if config.method == CorrelationMethod::Pearson {
        return Ok(pearson_correlation(clr));
    }

    let passes = config.iterations.max(1);
    let mut estimates = Vec::with_capacity(passes);
    estimates.push(single_pass(clr, config)?);
    for _ in 1..passes {
        let indices = bootstrap_indices(&mut *rng, n_samples);
        let resampled = clr.select_columns(indices.iter());
        estimates.push(single_pass(&resampled, config)?);
    }

    let mut combined = elementwise_median(&estimates);
    finalize(&mut combined);
    log::debug!(
        "Basis correlation over {} taxa from {} pass(es)",
        n_taxa,
        passes
    );
    Ok(combined)
}

/// Pearson correlation between CLR rows.
///
/// Known to be biased by the compositional constraint; kept as a baseline.
pub fn pearson_correlation(clr: &DMatrix<f64>) -> DMatrix<f64> {
    let (n_taxa, n_samples) = clr.shape();
    if n_taxa < 2 {
        return DMatrix::zeros(0, 0);
    }

    let centered: Vec<Vec<f64>> = (0..n_taxa)
        .map(|i| {
            let mean = clr.row(i).sum() / n_samples.max(1) as f64;
            clr.row(i).iter().map(|v| v - mean).collect()
        })
        .collect();
    let norms: Vec<f64> = centered
        .iter()
        .map(|row| row.iter().map(|v| v * v).sum::<f64>().sqrt())
        .collect();

    let mut corr = DMatrix::identity(n_taxa, n_taxa);
    for i in 0..n_taxa {
        for j in (i + 1)..n_taxa {
            let denom = norms[i] * norms[j];
            let r = if denom > ZERO_VARIANCE {
                let dot: f64 = centered[i].iter().zip(&centered[j]).map(|(a, b)| a * b).sum();
                dot / denom
            } else {
                0.0
            };
            corr[(i, j)] = r;
            corr[(j, i)] = r;
        }
    }
    finalize(&mut corr);
    corr
}

/// One estimate: basis variances, then iterative exclusion of the strongest pair.
fn single_pass(clr: &DMatrix<f64>, config: &BasisCorrelationConfig) -> Result<DMatrix<f64>> {
    let d = clr.nrows();
    let t = log_ratio_variances(clr);
    let flat: Vec<bool> = (0..d)
        .map(|i| {
            let row: Vec<f64> = clr.row(i).iter().copied().collect();
            sample_variance(&row) <= ZERO_VARIANCE
        })
        .collect();

    let mut omega = basis_variances(&t, None)?;
    let mut corr = correlation_from_basis(&t, &omega, &flat);

    let mut excluded = DMatrix::from_element(d, d, false);
    let mut partners = vec![d - 1; d];
    for _ in 0..config.exclusion_iterations {
        let mut strongest: Option<(usize, usize, f64)> = None;
        for i in 0..d {
            for j in (i + 1)..d {
                if excluded[(i, j)] || partners[i] <= MIN_PARTNERS || partners[j] <= MIN_PARTNERS {
                    continue;
                }
                let strength = corr[(i, j)].abs();
                if strength > config.exclusion_threshold
                    && strongest.map_or(true, |(_, _, s)| strength > s)
                {
                    strongest = Some((i, j, strength));
                }
            }
        }
        let Some((i, j, _)) = strongest else {
            break;
        };
        excluded[(i, j)] = true;
        excluded[(j, i)] = true;
        partners[i] -= 1;
        partners[j] -= 1;

        omega = basis_variances(&t, Some(&excluded))?;
        corr = correlation_from_basis(&t, &omega, &flat);
    }

    Ok(corr)
}

/// `corr_ij = (ω_i² + ω_j² - T_ij) / (2 ω_i ω_j)`, clamped to [-1, 1].
fn correlation_from_basis(t: &DMatrix<f64>, omega: &[f64], flat: &[bool]) -> DMatrix<f64> {
    let d = t.nrows();
    let mut corr = DMatrix::identity(d, d);
    for i in 0..d {
        for j in (i + 1)..d {
            let r = if flat[i] || flat[j] || omega[i] <= ZERO_VARIANCE || omega[j] <= ZERO_VARIANCE {
                0.0
            } else {
                (omega[i] + omega[j] - t[(i, j)]) / (2.0 * (omega[i] * omega[j]).sqrt())
            };
            let r = if r.is_finite() { r.clamp(-1.0, 1.0) } else { 0.0 };
            corr[(i, j)] = r;
            corr[(j, i)] = r;
        }
    }
    corr
}

fn elementwise_median(estimates: &[DMatrix<f64>]) -> DMatrix<f64> {
    let (rows, cols) = estimates[0].shape();
    let mut buffer = Vec::with_capacity(estimates.len());
    DMatrix::from_fn(rows, cols, |i, j| {
        buffer.clear();
        buffer.extend(estimates.iter().map(|m| m[(i, j)]));
        buffer.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let mid = buffer.len() / 2;
        if buffer.len() % 2 == 0 {
            (buffer[mid - 1] + buffer[mid]) / 2.0
        } else {
            buffer[mid]
        }
    })
}

/// Enforce exact symmetry, unit diagonal and the [-1, 1] bound.
fn finalize(corr: &mut DMatrix<f64>) {
    let d = corr.nrows();
    for i in 0..d {
        corr[(i, i)] = 1.0;
        for j in (i + 1)..d {
            let mut r = 0.5 * (corr[(i, j)] + corr[(j, i)]);
            if !r.is_finite() {
                r = 0.0;
            }
            let r = r.clamp(-1.0, 1.0);
            corr[(i, j)] = r;
            corr[(j, i)] = r;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{clr_transform, normalize_abundance};
    use crate::rng::{next_normal, Xorshift64};

    /// Absolute abundances where taxa 0 and 1 co-vary and the rest are independent.
    fn correlated_clr(n_taxa: usize, n_samples: usize, seed: u64) -> DMatrix<f64> {
        let mut rng = Xorshift64::new(seed);
        let mut log_abundance = vec![vec![0.0; n_samples]; n_taxa];
        for s in 0..n_samples {
            let shared = next_normal(&mut rng, 0.0, 1.0);
            log_abundance[0][s] = shared;
            log_abundance[1][s] = shared + next_normal(&mut rng, 0.0, 0.2);
            for row in log_abundance.iter_mut().skip(2) {
                row[s] = next_normal(&mut rng, 0.0, 1.0);
            }
        }
        let counts: Vec<Vec<f64>> = log_abundance
            .iter()
            .map(|row| row.iter().map(|v| (5.0 + v).exp()).collect())
            .collect();
        clr_transform(&normalize_abundance(&counts, 1.0).unwrap())
    }

    fn assert_valid_correlation(corr: &DMatrix<f64>) {
        let d = corr.nrows();
        assert_eq!(corr.ncols(), d);
        for i in 0..d {
            assert_eq!(corr[(i, i)], 1.0);
            for j in 0..d {
                assert_eq!(corr[(i, j)], corr[(j, i)]);
                assert!(corr[(i, j)] >= -1.0 && corr[(i, j)] <= 1.0);
            }
        }
    }

    #[test]
    fn test_detects_correlated_pair() {
        let clr = correlated_clr(8, 60, 7);
        let mut rng = Xorshift64::new(1);
        let corr = basis_correlation(&clr, &BasisCorrelationConfig::default(), &mut rng).unwrap();

        assert_valid_correlation(&corr);
        assert!(corr[(0, 1)] > 0.5, "corr = {}", corr[(0, 1)]);
        assert!(corr[(2, 3)].abs() < corr[(0, 1)]);
    }

    #[test]
    fn test_invariants_on_random_data() {
        let mut rng = Xorshift64::new(99);
        let clr = DMatrix::from_fn(6, 9, |_, _| next_normal(&mut rng, 0.0, 2.0));
        let config = BasisCorrelationConfig::default().with_iterations(5);
        let corr = basis_correlation(&clr, &config, &mut rng).unwrap();
        assert_valid_correlation(&corr);

        let pearson = pearson_correlation(&clr);
        assert_valid_correlation(&pearson);
    }

    #[test]
    fn test_fewer_than_two_taxa() {
        let mut rng = Xorshift64::new(1);
        let config = BasisCorrelationConfig::default();
        let corr = basis_correlation(&DMatrix::zeros(1, 5), &config, &mut rng).unwrap();
        assert_eq!(corr.shape(), (0, 0));
        assert_eq!(pearson_correlation(&DMatrix::zeros(0, 0)).shape(), (0, 0));
    }

    #[test]
    fn test_zero_variance_taxon_correlates_zero() {
        let clr = DMatrix::from_row_slice(3, 4, &[
            0.0, 0.0, 0.0, 0.0,
            1.0, -1.0, 0.5, -0.5,
            -1.0, 1.2, -0.4, 0.2,
        ]);
        let mut rng = Xorshift64::new(3);
        let corr = basis_correlation(&clr, &BasisCorrelationConfig::default(), &mut rng).unwrap();
        assert_eq!(corr[(0, 1)], 0.0);
        assert_eq!(corr[(0, 2)], 0.0);
        assert_eq!(corr[(0, 0)], 1.0);
        assert_eq!(pearson_correlation(&clr)[(0, 2)], 0.0);
    }

    #[test]
    fn test_single_sample_is_finite() {
        let clr = DMatrix::from_row_slice(3, 1, &[0.0, 0.0, 0.0]);
        let mut rng = Xorshift64::new(3);
        let corr = basis_correlation(&clr, &BasisCorrelationConfig::default(), &mut rng).unwrap();
        assert_valid_correlation(&corr);
        assert_eq!(corr[(0, 1)], 0.0);
    }

    #[test]
    fn test_deterministic_for_same_rng() {
        let clr = correlated_clr(6, 20, 11);
        let config = BasisCorrelationConfig::default().with_iterations(8);
        let a = basis_correlation(&clr, &config, &mut Xorshift64::new(5)).unwrap();
        let b = basis_correlation(&clr, &config, &mut Xorshift64::new(5)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_single_pass_draws_no_randomness() {
        let clr = correlated_clr(5, 10, 2);
        let config = BasisCorrelationConfig::default().with_iterations(1);
        let mut draws = 0usize;
        let mut counting = || {
            draws += 1;
            0.5
        };
        basis_correlation(&clr, &config, &mut counting).unwrap();
        drop(counting);
        assert_eq!(draws, 0);
    }
}
