//! Automatic choice of the number of niches.

use super::engine::nmf;
use super::{NmfConfig, NmfResult};
use crate::error::Result;
use crate::rng::RandomSource;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Smallest rank the automatic selection will return.
pub const MIN_AUTO_RANK: usize = 2;

/// Default cap on the rank sweep.
pub const DEFAULT_MAX_RANK: usize = 8;

/// Elbow-based rank sweep settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankSelection {
    /// Largest rank tried; defaults to `min(taxa, samples, 8)`.
    pub max_rank: Option<usize>,
    /// Stop at the first rank whose next-rank relative error improvement is
    /// below this fraction.
    pub elbow_threshold: f64,
}

impl Default for RankSelection {
    fn default() -> Self {
        Self {
            max_rank: None,
            elbow_threshold: 0.1,
        }
    }
}

/// Fit ranks `2..=max_rank` and keep the elbow of the error curve.
///
/// Each candidate is fitted in increasing rank order with the shared RNG.
/// The chosen fit is returned as is (no refit), so its `k` is always at
/// least 2 for a non-empty `V`. An empty `V` gives an empty result.
pub fn select_rank<R: RandomSource + ?Sized>(
    v: &DMatrix<f64>,
    selection: &RankSelection,
    config: &NmfConfig,
    rng: &mut R,
) -> Result<NmfResult> {
    let (n_rows, n_cols) = v.shape();
    if n_rows == 0 || n_cols == 0 {
        return Ok(NmfResult::empty());
    }

    let max_rank = selection
        .max_rank
        .unwrap_or_else(|| n_rows.min(n_cols).min(DEFAULT_MAX_RANK))
        .max(MIN_AUTO_RANK);

    let mut fits = Vec::with_capacity(max_rank - MIN_AUTO_RANK + 1);
    for k in MIN_AUTO_RANK..=max_rank {
        fits.push(nmf(v, &config.clone().with_k(k), &mut *rng)?);
    }

    let chosen = fits
        .windows(2)
        .position(|pair| {
            let (current, next) = (pair[0].error, pair[1].error);
            let improvement = if current > 0.0 {
                (current - next) / current
            } else {
                0.0
            };
            improvement < selection.elbow_threshold
        })
        .unwrap_or(fits.len() - 1);

    log::info!(
        "Selected {} niches from ranks {}..={} (errors: {:?})",
        fits[chosen].k,
        MIN_AUTO_RANK,
        max_rank,
        fits.iter().map(|f| f.error).collect::<Vec<_>>()
    );

    Ok(fits.swap_remove(chosen))
}
