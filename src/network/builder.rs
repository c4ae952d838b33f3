//! Thresholding correlations into a co-occurrence graph.

use super::{CoOccurrenceNetwork, Edge, EdgeType, NetworkStats, Node};
use crate::correct::correct_bh;
use crate::correlate::CorrelationMatrix;
use crate::error::{NicheError, Result};
use crate::nmf::NmfResult;
use serde::{Deserialize, Serialize};

/// Edge filtering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Minimum |correlation| for an edge.
    pub correlation_threshold: f64,
    /// Maximum p-value for an edge; 1 disables p-value filtering.
    pub pvalue_threshold: f64,
    /// Keep negative-correlation edges.
    pub include_negative: bool,
    /// Benjamini-Hochberg adjust pair p-values before filtering.
    pub fdr_correction: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            correlation_threshold: 0.3,
            pvalue_threshold: 0.05,
            include_negative: true,
            fdr_correction: false,
        }
    }
}

impl NetworkConfig {
    pub fn with_correlation_threshold(mut self, threshold: f64) -> Self {
        self.correlation_threshold = threshold;
        self
    }

    pub fn with_pvalue_threshold(mut self, threshold: f64) -> Self {
        self.pvalue_threshold = threshold;
        self
    }

    pub fn with_negative(mut self, include_negative: bool) -> Self {
        self.include_negative = include_negative;
        self
    }

    pub fn with_fdr_correction(mut self, fdr_correction: bool) -> Self {
        self.fdr_correction = fdr_correction;
        self
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("correlation_threshold", self.correlation_threshold),
            ("pvalue_threshold", self.pvalue_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(NicheError::InvalidParameter(format!(
                    "{} must be in [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Build the co-occurrence network.
///
/// Every taxon becomes a node, connected or not. A pair i < j gets an edge
/// when `|r| >= correlation_threshold` and its p-value is at most
/// `pvalue_threshold`. P-value filtering is skipped when the threshold is 1
/// or the matrix carries no p-values. Negative edges are dropped entirely
/// when `include_negative` is false.
///
/// # Errors
/// Thresholds outside [0, 1], or a non-empty factorization whose `W` does
/// not have one row per taxon.
pub fn build_network(
    correlation: &CorrelationMatrix,
    nmf: &NmfResult,
    config: &NetworkConfig,
) -> Result<CoOccurrenceNetwork> {
    config.validate()?;
    let n_taxa = correlation.n_taxa();
    if !nmf.is_empty() && nmf.w.nrows() != n_taxa {
        return Err(NicheError::DimensionMismatch {
            expected: n_taxa,
            actual: nmf.w.nrows(),
        });
    }

    let pairs: Vec<(usize, usize)> = (0..n_taxa)
        .flat_map(|i| ((i + 1)..n_taxa).map(move |j| (i, j)))
        .collect();

    let filter_p = config.pvalue_threshold < 1.0 && correlation.p_values.is_some();
    if config.pvalue_threshold < 1.0 && correlation.p_values.is_none() {
        log::debug!("No p-values attached; skipping p-value filtering");
    }
    let pair_p: Vec<Option<f64>> = {
        let raw: Vec<Option<f64>> = pairs
            .iter()
            .map(|&(i, j)| correlation.p_value(i, j))
            .collect();
        if config.fdr_correction && correlation.p_values.is_some() {
            let flat: Vec<f64> = raw.iter().map(|p| p.unwrap_or(1.0)).collect();
            correct_bh(&flat).into_iter().map(Some).collect()
        } else {
            raw
        }
    };

    let mut edges = Vec::new();
    let mut degree = vec![0usize; n_taxa];
    for (&(i, j), p_value) in pairs.iter().zip(pair_p) {
        let r = correlation.get(i, j);
        if r.abs() < config.correlation_threshold {
            continue;
        }
        if filter_p && p_value.map_or(false, |p| p > config.pvalue_threshold) {
            continue;
        }
        let edge_type = if r > 0.0 {
            EdgeType::Positive
        } else {
            EdgeType::Negative
        };
        if edge_type == EdgeType::Negative && !config.include_negative {
            continue;
        }

        degree[i] += 1;
        degree[j] += 1;
        edges.push(Edge {
            source: correlation.taxa[i].clone(),
            target: correlation.taxa[j].clone(),
            weight: r.abs(),
            correlation: r,
            p_value,
            edge_type,
        });
    }

    let nodes: Vec<Node> = correlation
        .taxa
        .iter()
        .enumerate()
        .map(|(i, taxon)| Node {
            taxon: taxon.clone(),
            niche_loadings: nmf.loadings(i),
            degree: degree[i],
        })
        .collect();

    let stats = NetworkStats::compute(nodes.len(), &edges);
    log::info!(
        "Network: {} nodes, {} edges (density {:.3}, {:.0}% positive)",
        stats.node_count,
        stats.edge_count,
        stats.density,
        stats.positive_ratio * 100.0
    );

    Ok(CoOccurrenceNetwork {
        nodes,
        edges,
        stats,
    })
}
