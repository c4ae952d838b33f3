//! Row-relative abundance normalization.
//!
//! Each taxon's profile across samples is rescaled to sum to one after a
//! pseudocount is added, turning raw counts into proportions that the CLR
//! transform and NMF can work with.

use crate::error::Result;
use crate::zero::pseudocount::add_pseudocount;
use nalgebra::DMatrix;
use rayon::prelude::*;

/// Add `pseudocount` to every entry, then divide each row by its sum.
///
/// # Formula
/// For taxon i: x'_ij = (x_ij + c) / Σ_j (x_ij + c)
///
/// A row whose sum is zero after the pseudocount (only possible with `c = 0`
/// and an all-zero row) is returned as zeros instead of NaN. Empty input
/// yields a 0×0 matrix.
///
/// # Errors
/// Ragged rows, negative or non-finite counts, and a negative or non-finite
/// pseudocount are rejected.
pub fn normalize_abundance(counts: &[Vec<f64>], pseudocount: f64) -> Result<DMatrix<f64>> {
    let shifted = add_pseudocount(counts, pseudocount)?;
    let (n_taxa, n_samples) = shifted.shape();

    let row_sums: Vec<f64> = (0..n_taxa)
        .into_par_iter()
        .map(|i| shifted.row(i).sum())
        .collect();

    Ok(DMatrix::from_fn(n_taxa, n_samples, |i, j| {
        let total = row_sums[i];
        if total > 0.0 {
            shifted[(i, j)] / total
        } else {
            shifted[(i, j)]
        }
    }))
}
