//! Bootstrap stability of primary niche assignments.

use super::profiler::{niche_weights, primary_niche};
use crate::data::AbundanceTable;
use crate::error::Result;
use crate::nmf::{nmf, NmfConfig, NmfResult};
use crate::rng::{bootstrap_indices, RandomSource};
use nalgebra::DMatrix;

/// Match bootstrap components to reference components.
///
/// NMF components come back in arbitrary order, so each bootstrap column of
/// `W` is paired greedily with the most cosine-similar reference column.
/// Returns `mapping[bootstrap] = reference`.
pub fn match_components(reference: &DMatrix<f64>, bootstrap: &DMatrix<f64>) -> Vec<usize> {
    let k_ref = reference.ncols();
    let k_boot = bootstrap.ncols();

    let mut candidates: Vec<(f64, usize, usize)> = Vec::with_capacity(k_ref * k_boot);
    for b in 0..k_boot {
        for r in 0..k_ref {
            let norm = reference.column(r).norm() * bootstrap.column(b).norm();
            let similarity = if norm > 0.0 {
                reference.column(r).dot(&bootstrap.column(b)) / norm
            } else {
                0.0
            };
            candidates.push((similarity, b, r));
        }
    }
    // Highest similarity first; index order breaks ties.
    candidates.sort_by(|x, y| {
        y.0.partial_cmp(&x.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(x.1.cmp(&y.1))
            .then(x.2.cmp(&y.2))
    });

    let mut mapping = vec![usize::MAX; k_boot];
    let mut taken = vec![false; k_ref];
    for (_, b, r) in candidates {
        if mapping[b] == usize::MAX && !taken[r] {
            mapping[b] = r;
            taken[r] = true;
        }
    }
    // Only reachable when k_boot > k_ref.
    for (b, slot) in mapping.iter_mut().enumerate() {
        if *slot == usize::MAX {
            *slot = b.min(k_ref.saturating_sub(1));
        }
    }
    mapping
}

/// Fraction of bootstrap resamples in which each taxon keeps its primary niche.
///
/// Samples are drawn with replacement (`n_samples` draws per resample), the
/// resampled table is renormalized with `pseudocount`, and NMF is refitted at
/// the reference rank. Zero iterations give stability 1 for every taxon.
pub fn bootstrap_stability<R: RandomSource + ?Sized>(
    table: &AbundanceTable,
    pseudocount: f64,
    reference: &NmfResult,
    primaries: &[usize],
    iterations: usize,
    config: &NmfConfig,
    rng: &mut R,
) -> Result<Vec<f64>> {
    let n_taxa = table.n_taxa();
    if iterations == 0 || reference.is_empty() {
        return Ok(vec![1.0; n_taxa]);
    }

    let fit_config = config.clone().with_k(reference.k);
    let mut agreements = vec![0usize; n_taxa];
    for _ in 0..iterations {
        let indices = bootstrap_indices(&mut *rng, table.n_samples());
        let resampled = table.select_samples(&indices)?.normalized(pseudocount)?;
        let fit = nmf(&resampled, &fit_config, &mut *rng)?;
        let mapping = match_components(&reference.w, &fit.w);

        for (i, count) in agreements.iter_mut().enumerate() {
            let weights = niche_weights(&fit.loadings(i), fit.k);
            if mapping[primary_niche(&weights)] == primaries[i] {
                *count += 1;
            }
        }
    }

    Ok(agreements
        .into_iter()
        .map(|c| c as f64 / iterations as f64)
        .collect())
}
