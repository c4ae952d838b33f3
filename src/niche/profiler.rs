//! End-to-end niche profiling.

use super::config::NicheConfig;
use super::habitat::associated_habitats;
use super::stability::bootstrap_stability;
use super::{NicheAnalysis, NicheProfile};
use crate::correlate::CorrelationMatrix;
use crate::data::{AbundanceTable, SampleMetadata};
use crate::error::Result;
use crate::network::build_network;
use crate::nmf::{nmf, select_rank, NmfResult, MIN_AUTO_RANK};
use crate::normalize::clr_from_normalized;
use crate::rng::RandomSource;
use nalgebra::DMatrix;

/// Normalize loadings to sum to one; uniform when they carry no mass.
pub fn niche_weights(loadings: &[f64], k: usize) -> Vec<f64> {
    if k == 0 {
        return Vec::new();
    }
    let total: f64 = loadings.iter().take(k).sum();
    if loadings.len() < k || !total.is_finite() || total <= 0.0 {
        return vec![1.0 / k as f64; k];
    }
    loadings.iter().take(k).map(|w| w / total).collect()
}

/// Index of the largest weight; the lowest index wins ties.
pub fn primary_niche(weights: &[f64]) -> usize {
    let mut best = 0;
    for (i, &w) in weights.iter().enumerate() {
        if w > weights[best] {
            best = i;
        }
    }
    best
}

/// Margin of the primary weight over the runner-up, clamped to [0, 1].
pub fn niche_confidence(weights: &[f64]) -> f64 {
    if weights.is_empty() {
        return 0.0;
    }
    let primary = primary_niche(weights);
    let runner_up = weights
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != primary)
        .map(|(_, &w)| w)
        .fold(0.0, f64::max);
    (weights[primary] - runner_up).clamp(0.0, 1.0)
}

/// Run the full co-occurrence and niche discovery pipeline.
///
/// Stages run in order: row normalization with `config.pseudocount`, CLR,
/// basis correlation with p-values, NMF on the normalized matrix (fixed or
/// automatically selected rank), network construction, then one profile per
/// taxon. The RNG is consumed in that same order: correlation bootstrap,
/// NMF fit(s), then the stability bootstrap.
///
/// Degenerate tables do not fail: no taxa give an empty analysis, a single
/// taxon or sample still yields one profile per taxon, and all-zero counts
/// are kept finite by the pseudocount. Without samples there is nothing to
/// factor, so weights are uniform and confidence is 0.
///
/// # Errors
/// Invalid configuration (non-positive pseudocount, thresholds out of range).
pub fn profile_niches<R: RandomSource + ?Sized>(
    table: &AbundanceTable,
    metadata: Option<&SampleMetadata>,
    config: &NicheConfig,
    rng: &mut R,
) -> Result<NicheAnalysis> {
    config.validate()?;
    let n_taxa = table.n_taxa();
    let n_samples = table.n_samples();
    log::info!(
        "Profiling niches for {} taxa across {} samples",
        n_taxa,
        n_samples
    );

    if n_taxa == 0 {
        let correlation = CorrelationMatrix::new(Vec::new(), DMatrix::zeros(0, 0))?;
        let nmf_result = NmfResult::empty();
        let network = build_network(&correlation, &nmf_result, &config.network)?;
        return Ok(NicheAnalysis {
            correlation,
            nmf: nmf_result,
            network,
            profiles: Vec::new(),
            k: 0,
        });
    }

    let normalized = table.normalized(config.pseudocount)?;
    let clr = clr_from_normalized(&normalized, table.taxa().to_vec(), table.samples().to_vec());
    let correlation = CorrelationMatrix::estimate(&clr, &config.correlation, &mut *rng)?;

    let nmf_result = if n_samples == 0 {
        NmfResult::empty()
    } else if config.num_niches == 0 {
        select_rank(&normalized, &config.rank_selection, &config.nmf, &mut *rng)?
    } else {
        nmf(
            &normalized,
            &config.nmf.clone().with_k(config.num_niches),
            &mut *rng,
        )?
    };
    if !nmf_result.converged {
        log::warn!(
            "NMF did not converge within {} iterations (error {:.6})",
            nmf_result.iterations,
            nmf_result.error
        );
    }

    let network = build_network(&correlation, &nmf_result, &config.network)?;

    let k = match (nmf_result.is_empty(), config.num_niches) {
        (false, _) => nmf_result.k,
        (true, 0) => MIN_AUTO_RANK,
        (true, requested) => requested,
    };

    let weights: Vec<Vec<f64>> = (0..n_taxa)
        .map(|i| niche_weights(&nmf_result.loadings(i), k))
        .collect();
    let primaries: Vec<usize> = weights.iter().map(|w| primary_niche(w)).collect();

    let stability = if nmf_result.is_empty() {
        vec![0.0; n_taxa]
    } else {
        bootstrap_stability(
            table,
            config.pseudocount,
            &nmf_result,
            &primaries,
            config.bootstrap_iterations,
            &config.nmf,
            &mut *rng,
        )?
    };

    let profiles: Vec<NicheProfile> = table
        .taxa()
        .iter()
        .enumerate()
        .map(|(i, taxon)| {
            let confidence = (niche_confidence(&weights[i]) * stability[i]).clamp(0.0, 1.0);
            let associated = match metadata {
                Some(meta) => associated_habitats(
                    i,
                    primaries[i],
                    &nmf_result,
                    table.samples(),
                    meta,
                    config.habitat_fraction,
                ),
                None => Vec::new(),
            };
            NicheProfile {
                taxon: taxon.clone(),
                niche_weights: weights[i].clone(),
                primary_niche: primaries[i],
                niche_confidence: confidence,
                stability: stability[i],
                associated_habitats: associated,
            }
        })
        .collect();

    log::info!(
        "Assigned {} taxa to {} niches ({} edges in network)",
        profiles.len(),
        k,
        network.stats.edge_count
    );

    Ok(NicheAnalysis {
        correlation,
        nmf: nmf_result,
        network,
        profiles,
        k,
    })
}
