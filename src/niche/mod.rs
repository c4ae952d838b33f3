//! Per-taxon niche profiles and the end-to-end discovery pipeline.
//!
//! The profiler runs normalization, CLR, basis correlation, NMF and network
//! construction in order, then turns each taxon's NMF loadings into a niche
//! weight vector with a bootstrap-tempered confidence and, when sample
//! metadata is available, the habitats where its primary niche is active.

mod config;
mod habitat;
mod profiler;
mod stability;

pub use config::NicheConfig;
pub use habitat::associated_habitats;
pub use profiler::{niche_confidence, niche_weights, primary_niche, profile_niches};
pub use stability::{bootstrap_stability, match_components};

use crate::correlate::CorrelationMatrix;
use crate::network::CoOccurrenceNetwork;
use crate::nmf::NmfResult;
use serde::{Deserialize, Serialize};

/// Niche membership of one taxon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NicheProfile {
    pub taxon: String,
    /// Share of the taxon's loading in each niche; sums to 1.
    pub niche_weights: Vec<f64>,
    /// Index of the largest weight.
    pub primary_niche: usize,
    /// Dominance of the primary niche tempered by bootstrap stability, in [0, 1].
    pub niche_confidence: f64,
    /// Fraction of bootstrap resamples that kept the same primary niche.
    pub stability: f64,
    /// Habitats of the samples where the primary niche carries this taxon.
    pub associated_habitats: Vec<String>,
}

/// Everything produced by one pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NicheAnalysis {
    pub correlation: CorrelationMatrix,
    pub nmf: NmfResult,
    pub network: CoOccurrenceNetwork,
    pub profiles: Vec<NicheProfile>,
    /// Number of niches the profiles are expressed in.
    pub k: usize,
}

impl NicheAnalysis {
    /// Profile for a taxon.
    pub fn profile(&self, taxon: &str) -> Option<&NicheProfile> {
        self.profiles.iter().find(|p| p.taxon == taxon)
    }

    /// Taxa grouped by primary niche.
    pub fn members(&self) -> Vec<Vec<&str>> {
        let mut groups = vec![Vec::new(); self.k];
        for profile in &self.profiles {
            if let Some(group) = groups.get_mut(profile.primary_niche) {
                group.push(profile.taxon.as_str());
            }
        }
        groups
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
