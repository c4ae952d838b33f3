//! Pipeline configuration.

use crate::correlate::BasisCorrelationConfig;
use crate::error::{NicheError, Result};
use crate::network::NetworkConfig;
use crate::nmf::{NmfConfig, RankSelection};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for [`profile_niches`](super::profile_niches).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NicheConfig {
    /// Number of niches; 0 selects one automatically (always >= 2).
    pub num_niches: usize,
    /// Bootstrap resamples used to assess primary-niche stability.
    pub bootstrap_iterations: usize,
    /// Added to every count before normalization; must be positive.
    pub pseudocount: f64,
    /// Samples scoring at least this fraction of a taxon's best sample
    /// contribute their habitat.
    pub habitat_fraction: f64,
    pub correlation: BasisCorrelationConfig,
    /// Iteration budget and tolerance for every NMF fit (`k` is ignored).
    pub nmf: NmfConfig,
    pub rank_selection: RankSelection,
    pub network: NetworkConfig,
}

impl Default for NicheConfig {
    fn default() -> Self {
        Self {
            num_niches: 0,
            bootstrap_iterations: 20,
            pseudocount: 1.0,
            habitat_fraction: 0.5,
            correlation: BasisCorrelationConfig::default(),
            nmf: NmfConfig::default(),
            rank_selection: RankSelection::default(),
            network: NetworkConfig::default(),
        }
    }
}

impl NicheConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(NicheError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(NicheError::from)
    }

    /// Load from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn with_num_niches(mut self, num_niches: usize) -> Self {
        self.num_niches = num_niches;
        self
    }

    pub fn with_bootstrap_iterations(mut self, iterations: usize) -> Self {
        self.bootstrap_iterations = iterations;
        self
    }

    pub fn with_pseudocount(mut self, pseudocount: f64) -> Self {
        self.pseudocount = pseudocount;
        self
    }

    pub fn with_correlation(mut self, correlation: BasisCorrelationConfig) -> Self {
        self.correlation = correlation;
        self
    }

    pub fn with_nmf(mut self, nmf: NmfConfig) -> Self {
        self.nmf = nmf;
        self
    }

    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !self.pseudocount.is_finite() || self.pseudocount <= 0.0 {
            return Err(NicheError::InvalidParameter(format!(
                "Pseudocount must be positive, got {}",
                self.pseudocount
            )));
        }
        if !(0.0..=1.0).contains(&self.habitat_fraction) {
            return Err(NicheError::InvalidParameter(format!(
                "habitat_fraction must be in [0, 1], got {}",
                self.habitat_fraction
            )));
        }
        Ok(())
    }
}
