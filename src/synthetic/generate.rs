//! Synthetic abundance tables with known niche structure.
//!
//! Tables are built around latent community archetypes: every taxon belongs
//! to one archetype and every sample is dominated by one, so the factorization
//! has a planted answer to recover. All randomness comes from the injected
//! [`RandomSource`].

use crate::data::{AbundanceTable, SampleMetadata, SampleRecord};
use crate::error::Result;
use crate::rng::{next_normal, uniform, RandomSource};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_HABITATS: [&str; 6] = ["marine", "soil", "gut", "freshwater", "sediment", "wastewater"];

/// Configuration for synthetic table generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub num_taxa: usize,
    pub num_samples: usize,
    /// Number of latent archetypes (treated as 1 when 0).
    pub num_niches: usize,
    /// Mean sequencing depth scale per sample.
    pub mean_depth: f64,
    /// Affinity of a taxon for samples dominated by its own archetype (0-1).
    pub specificity: f64,
    /// Log-scale standard deviation of per-entry noise.
    pub noise_sd: f64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            num_taxa: 20,
            num_samples: 12,
            num_niches: 3,
            mean_depth: 1000.0,
            specificity: 0.8,
            noise_sd: 0.3,
        }
    }
}

impl DemoConfig {
    pub fn new(num_taxa: usize, num_samples: usize, num_niches: usize) -> Self {
        Self {
            num_taxa,
            num_samples,
            num_niches,
            ..Default::default()
        }
    }

    pub fn with_depth(mut self, mean_depth: f64) -> Self {
        self.mean_depth = mean_depth.max(0.0);
        self
    }

    pub fn with_specificity(mut self, specificity: f64) -> Self {
        self.specificity = specificity.clamp(0.0, 1.0);
        self
    }

    pub fn with_noise(mut self, noise_sd: f64) -> Self {
        self.noise_sd = noise_sd.max(0.0);
        self
    }
}

/// A synthetic table together with its planted structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoDataset {
    pub table: AbundanceTable,
    /// One habitat per archetype, assigned to samples by dominant archetype.
    pub metadata: SampleMetadata,
    /// Archetype of each taxon.
    pub taxon_niches: Vec<usize>,
    /// Dominant archetype of each sample.
    pub sample_niches: Vec<usize>,
    pub config: DemoConfig,
}

impl DemoDataset {
    /// Write `counts.tsv`, `metadata.tsv` and `config.yaml` to a directory.
    pub fn write_to_dir(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        self.table.to_tsv(dir.join("counts.tsv"))?;
        self.metadata.to_tsv(dir.join("metadata.tsv"))?;
        std::fs::write(dir.join("config.yaml"), serde_yaml::to_string(&self.config)?)?;
        Ok(())
    }
}

/// Habitat label for an archetype.
pub fn habitat_name(niche: usize) -> String {
    DEFAULT_HABITATS
        .get(niche)
        .map(|h| h.to_string())
        .unwrap_or_else(|| format!("habitat_{}", niche))
}

/// Generate a table of `num_taxa` × `num_samples` non-negative counts with
/// `num_niches` archetypes. Identical RNG streams give identical counts.
pub fn generate_demo_abundance_table<R: RandomSource + ?Sized>(
    num_taxa: usize,
    num_samples: usize,
    num_niches: usize,
    rng: &mut R,
) -> Result<AbundanceTable> {
    let config = DemoConfig::new(num_taxa, num_samples, num_niches);
    Ok(generate_demo_dataset(&config, rng)?.table)
}

/// Generate a synthetic dataset with ground truth and habitat metadata.
///
/// RNG draws happen in a fixed order: one base abundance per taxon, one depth
/// per sample, then the counts row by row.
pub fn generate_demo_dataset<R: RandomSource + ?Sized>(
    config: &DemoConfig,
    rng: &mut R,
) -> Result<DemoDataset> {
    let n_niches = config.num_niches.max(1);
    let taxa: Vec<String> = (0..config.num_taxa).map(|i| format!("phage_{:03}", i)).collect();
    let samples: Vec<String> = (0..config.num_samples).map(|j| format!("S{:03}", j)).collect();

    let taxon_niches: Vec<usize> = (0..config.num_taxa).map(|i| i % n_niches).collect();
    let sample_niches: Vec<usize> = (0..config.num_samples).map(|j| j % n_niches).collect();

    let base_abundances: Vec<f64> = (0..config.num_taxa)
        .map(|_| next_normal(rng, 0.0, 1.0).exp())
        .collect();
    let depths: Vec<f64> = (0..config.num_samples)
        .map(|_| config.mean_depth * next_normal(rng, 0.0, 0.3).exp())
        .collect();

    let off_target = (1.0 - config.specificity) / (n_niches.max(2) - 1) as f64;

    let mut counts = vec![vec![0.0; config.num_samples]; config.num_taxa];
    for (i, row) in counts.iter_mut().enumerate() {
        for (j, value) in row.iter_mut().enumerate() {
            let affinity = if n_niches == 1 {
                1.0
            } else if taxon_niches[i] == sample_niches[j] {
                config.specificity
            } else {
                off_target
            };
            let noise = next_normal(rng, 0.0, config.noise_sd).exp();
            let expected = depths[j] * base_abundances[i] * affinity * noise / n_niches as f64;
            *value = next_poisson(rng, expected) as f64;
        }
    }

    let metadata = SampleMetadata::new(
        samples
            .iter()
            .zip(&sample_niches)
            .map(|(s, &n)| SampleRecord::new(s.clone(), habitat_name(n)))
            .collect(),
    );

    Ok(DemoDataset {
        table: AbundanceTable::new(taxa, samples, counts)?,
        metadata,
        taxon_niches,
        sample_niches,
        config: config.clone(),
    })
}

/// Poisson draw: multiplication method for small rates, normal
/// approximation for large ones.
fn next_poisson<R: RandomSource + ?Sized>(rng: &mut R, lambda: f64) -> u64 {
    if !lambda.is_finite() || lambda <= 0.0 {
        return 0;
    }
    if lambda < 30.0 {
        let l = (-lambda).exp();
        let mut k = 0u64;
        let mut p = 1.0;
        loop {
            k += 1;
            p *= uniform(rng);
            if p <= l {
                return k - 1;
            }
        }
    } else {
        next_normal(rng, lambda, lambda.sqrt()).max(0.0).round() as u64
    }
}
