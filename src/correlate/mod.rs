//! Pairwise taxon correlation on compositional data.
//!
//! - **basis**: log-ratio variances and the least-squares basis variance solve
//! - **sparcc**: bias-corrected basis correlation with bootstrap passes
//! - **significance**: Student-t p-values for correlation coefficients

pub mod basis;
pub mod significance;
pub mod sparcc;

pub use basis::{basis_variances, log_ratio_variances};
pub use significance::correlation_pvalues;
pub use sparcc::{basis_correlation, pearson_correlation, BasisCorrelationConfig, CorrelationMethod};

use crate::error::{NicheError, Result};
use crate::normalize::ClrMatrix;
use crate::rng::RandomSource;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Tolerance for the symmetry check on externally supplied matrices.
const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Labelled taxon × taxon correlation matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    /// Taxon identifiers (row and column order).
    pub taxa: Vec<String>,
    /// Correlation coefficients, symmetric with unit diagonal.
    pub correlations: DMatrix<f64>,
    /// Two-sided p-values, when estimated.
    pub p_values: Option<DMatrix<f64>>,
    /// Number of samples the estimate is based on (0 if unknown).
    pub n_samples: usize,
}

impl CorrelationMatrix {
    /// Wrap a correlation matrix, checking the invariants.
    ///
    /// The matrix must be square with one row per taxon, symmetric, have a
    /// unit diagonal and finite entries in [-1, 1].
    pub fn new(taxa: Vec<String>, correlations: DMatrix<f64>) -> Result<Self> {
        let d = taxa.len();
        if correlations.nrows() != d {
            return Err(NicheError::DimensionMismatch {
                expected: d,
                actual: correlations.nrows(),
            });
        }
        if correlations.ncols() != d {
            return Err(NicheError::DimensionMismatch {
                expected: d,
                actual: correlations.ncols(),
            });
        }
        for i in 0..d {
            if (correlations[(i, i)] - 1.0).abs() > SYMMETRY_TOLERANCE {
                return Err(NicheError::InvalidParameter(format!(
                    "Diagonal entry {} is {}, expected 1",
                    i,
                    correlations[(i, i)]
                )));
            }
            for j in 0..d {
                let r = correlations[(i, j)];
                if !r.is_finite() || !(-1.0..=1.0).contains(&r) {
                    return Err(NicheError::InvalidParameter(format!(
                        "Correlation ({}, {}) = {} is outside [-1, 1]",
                        i, j, r
                    )));
                }
                if (r - correlations[(j, i)]).abs() > SYMMETRY_TOLERANCE {
                    return Err(NicheError::InvalidParameter(format!(
                        "Correlation matrix is not symmetric at ({}, {})",
                        i, j
                    )));
                }
            }
        }

        Ok(Self {
            taxa,
            correlations,
            p_values: None,
            n_samples: 0,
        })
    }

    /// Build from nested rows.
    pub fn from_rows(taxa: Vec<String>, rows: &[Vec<f64>]) -> Result<Self> {
        let d = rows.len();
        if let Some(bad) = rows.iter().find(|row| row.len() != d) {
            return Err(NicheError::DimensionMismatch {
                expected: d,
                actual: bad.len(),
            });
        }
        Self::new(taxa, DMatrix::from_fn(d, d, |i, j| rows[i][j]))
    }

    /// Attach p-values (same shape as the correlations).
    pub fn with_p_values(mut self, p_values: DMatrix<f64>) -> Result<Self> {
        if p_values.shape() != self.correlations.shape() {
            return Err(NicheError::DimensionMismatch {
                expected: self.correlations.nrows(),
                actual: p_values.nrows(),
            });
        }
        self.p_values = Some(p_values);
        Ok(self)
    }

    /// Record the sample count and derive Student-t p-values from it.
    pub fn with_sample_count(mut self, n_samples: usize) -> Result<Self> {
        let p_values = correlation_pvalues(&self.correlations, n_samples)?;
        self.n_samples = n_samples;
        self.with_p_values(p_values)
    }

    /// Estimate correlations (and p-values) from labelled CLR data.
    ///
    /// A single taxon yields a 1×1 identity; no taxa an empty matrix.
    pub fn estimate<R: RandomSource + ?Sized>(
        clr: &ClrMatrix,
        config: &BasisCorrelationConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let n_taxa = clr.n_taxa();
        let correlations = if n_taxa < 2 {
            DMatrix::identity(n_taxa, n_taxa)
        } else {
            basis_correlation(clr.matrix(), config, rng)?
        };
        Self::new(clr.taxa.clone(), correlations)?.with_sample_count(clr.n_samples())
    }

    /// Correlation between taxa i and j.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.correlations[(i, j)]
    }

    /// P-value for the pair, if available.
    pub fn p_value(&self, i: usize, j: usize) -> Option<f64> {
        self.p_values.as_ref().map(|p| p[(i, j)])
    }

    /// Number of taxa.
    pub fn n_taxa(&self) -> usize {
        self.taxa.len()
    }

    /// Correlations as nested rows.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.correlations
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect()
    }
}
