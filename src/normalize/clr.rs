//! Centered Log-Ratio (CLR) transformation for compositional data.

use crate::data::AbundanceTable;
use crate::error::Result;
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Values at or below zero are raised to this floor before taking logs.
pub const CLR_FLOOR: f64 = 1e-12;

/// A CLR-transformed matrix with its labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClrMatrix {
    /// The transformed data (taxa × samples).
    pub data: DMatrix<f64>,
    /// Taxon identifiers.
    pub taxa: Vec<String>,
    /// Sample identifiers.
    pub samples: Vec<String>,
    /// Geometric mean of each taxon's normalized profile.
    pub geometric_means: Vec<f64>,
}

impl ClrMatrix {
    /// Get the transformed value for a taxon and sample.
    pub fn get(&self, taxon: usize, sample: usize) -> f64 {
        self.data[(taxon, sample)]
    }

    /// Number of taxa.
    pub fn n_taxa(&self) -> usize {
        self.data.nrows()
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Get a row (taxon) as a vector.
    pub fn row(&self, taxon: usize) -> Vec<f64> {
        self.data.row(taxon).iter().cloned().collect()
    }

    /// Get reference to the underlying matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }
}

/// Apply the Centered Log-Ratio transformation row by row.
///
/// # Formula
/// For taxon i: CLR(x_ij) = ln(x_ij) - mean_j(ln(x_ij))
///
/// Every output row sums to zero. Input should be normalized with a positive
/// pseudocount; entries `<= 0` are floored at [`CLR_FLOOR`] so the output
/// stays finite, and a warning reports how many were floored.
pub fn clr_transform(normalized: &DMatrix<f64>) -> DMatrix<f64> {
    let (n_taxa, n_samples) = normalized.shape();
    if n_taxa == 0 || n_samples == 0 {
        return DMatrix::zeros(n_taxa, n_samples);
    }

    let floored = normalized.iter().filter(|&&x| !(x > 0.0)).count();
    if floored > 0 {
        log::warn!(
            "CLR input has {} non-positive entries; flooring at {:e}",
            floored,
            CLR_FLOOR
        );
    }

    let log_data = normalized.map(|x| if x > CLR_FLOOR { x.ln() } else { CLR_FLOOR.ln() });

    let row_means: Vec<f64> = (0..n_taxa)
        .into_par_iter()
        .map(|i| log_data.row(i).sum() / n_samples as f64)
        .collect();

    DMatrix::from_fn(n_taxa, n_samples, |i, j| log_data[(i, j)] - row_means[i])
}

/// Normalize a table with a pseudocount and CLR-transform it, keeping labels.
pub fn norm_clr(table: &AbundanceTable, pseudocount: f64) -> Result<ClrMatrix> {
    let normalized = table.normalized(pseudocount)?;
    Ok(clr_from_normalized(
        &normalized,
        table.taxa().to_vec(),
        table.samples().to_vec(),
    ))
}

/// Label an already normalized matrix and CLR-transform it.
pub fn clr_from_normalized(
    normalized: &DMatrix<f64>,
    taxa: Vec<String>,
    samples: Vec<String>,
) -> ClrMatrix {
    let data = clr_transform(normalized);
    let n_samples = normalized.ncols().max(1) as f64;
    let geometric_means = (0..normalized.nrows())
        .map(|i| {
            let mean_log: f64 = normalized
                .row(i)
                .iter()
                .map(|&x| x.max(CLR_FLOOR).ln())
                .sum::<f64>()
                / n_samples;
            mean_log.exp()
        })
        .collect();

    ClrMatrix {
        data,
        taxa,
        samples,
        geometric_means,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_abundance;
    use approx::assert_relative_eq;

    #[test]
    fn test_clr_rows_sum_zero() {
        let normalized = normalize_abundance(
            &[
                vec![10.0, 20.0, 15.0, 5.0],
                vec![30.0, 40.0, 35.0, 25.0],
                vec![0.0, 10.0, 8.0, 3.0],
            ],
            0.5,
        )
        .unwrap();
        let clr = clr_transform(&normalized);
        for i in 0..clr.nrows() {
            assert_relative_eq!(clr.row(i).sum(), 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_clr_uniform_is_zero() {
        let normalized = DMatrix::from_element(2, 5, 0.2);
        let clr = clr_transform(&normalized);
        assert!(clr.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_clr_manual_calculation() {
        let normalized = DMatrix::from_row_slice(1, 2, &[0.2, 0.8]);
        let clr = clr_transform(&normalized);
        // geometric mean = sqrt(0.16) = 0.4
        assert_relative_eq!(clr[(0, 0)], (0.2_f64 / 0.4).ln(), epsilon = 1e-12);
        assert_relative_eq!(clr[(0, 1)], (0.8_f64 / 0.4).ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_clr_zero_entries_stay_finite() {
        let normalized = DMatrix::from_row_slice(2, 3, &[0.0, 0.5, 0.5, 0.0, 0.0, 0.0]);
        let clr = clr_transform(&normalized);
        assert!(clr.iter().all(|v| v.is_finite()));
        assert!(clr.row(1).iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_clr_empty() {
        assert_eq!(clr_transform(&DMatrix::zeros(0, 0)).shape(), (0, 0));
    }

    #[test]
    fn test_norm_clr_geometric_means() {
        let table = AbundanceTable::new(
            vec!["A".into()],
            vec!["S1".into(), "S2".into()],
            vec![vec![1.0, 7.0]],
        )
        .unwrap();
        let clr = norm_clr(&table, 1.0).unwrap();
        // normalized row = [0.2, 0.8]
        assert_relative_eq!(clr.geometric_means[0], 0.4, epsilon = 1e-12);
        assert_eq!(clr.taxa, vec!["A".to_string()]);
        assert_eq!(clr.n_samples(), 2);
    }
}
