//! Habitat association from niche activations.

use crate::data::SampleMetadata;
use crate::nmf::NmfResult;

/// Habitats where a taxon's primary niche is most active for that taxon.
///
/// Each sample is scored by the primary niche's contribution to the taxon,
/// `W[taxon, niche] * H[niche, sample]`. Samples scoring at least
/// `fraction` of the best score contribute their habitat; habitats are
/// returned once each, best-scoring first. Samples without metadata are
/// ignored.
pub fn associated_habitats(
    taxon: usize,
    niche: usize,
    nmf: &NmfResult,
    samples: &[String],
    metadata: &SampleMetadata,
    fraction: f64,
) -> Vec<String> {
    if nmf.is_empty() || taxon >= nmf.w.nrows() || niche >= nmf.k {
        return Vec::new();
    }
    let loading = nmf.w[(taxon, niche)];
    let scores: Vec<(usize, f64)> = (0..nmf.h.ncols().min(samples.len()))
        .map(|s| (s, loading * nmf.h[(niche, s)]))
        .collect();

    let best = scores.iter().map(|&(_, v)| v).fold(0.0, f64::max);
    if !(best > 0.0) {
        return Vec::new();
    }

    let mut ranked: Vec<(usize, f64)> = scores
        .into_iter()
        .filter(|&(_, v)| v >= fraction * best)
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut habitats: Vec<String> = Vec::new();
    for (s, _) in ranked {
        if let Some(habitat) = metadata.habitat(&samples[s]) {
            if !habitats.iter().any(|h| h == habitat) {
                habitats.push(habitat.to_string());
            }
        }
    }
    habitats
}
