//! Co-occurrence network construction.

pub mod builder;

pub use builder::{build_network, NetworkConfig};

use serde::{Deserialize, Serialize};

/// Sign of the correlation behind an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    Positive,
    Negative,
}

/// A taxon in the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub taxon: String,
    /// The taxon's NMF loadings (row of W); empty without a factorization.
    pub niche_loadings: Vec<f64>,
    /// Number of incident edges.
    pub degree: usize,
}

/// An undirected edge between two taxa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    /// Absolute correlation.
    pub weight: f64,
    /// Signed correlation.
    pub correlation: f64,
    /// P-value used for filtering (BH-adjusted when FDR correction is on).
    pub p_value: Option<f64>,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
}

/// Summary statistics of a network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub node_count: usize,
    pub edge_count: usize,
    /// Edges over the maximum possible `n (n - 1) / 2`; 0 for n <= 1.
    pub density: f64,
    /// Share of positive edges; 0 without edges.
    pub positive_ratio: f64,
    pub mean_degree: f64,
}

impl NetworkStats {
    /// Compute statistics for a node count and edge list.
    pub fn compute(node_count: usize, edges: &[Edge]) -> Self {
        let edge_count = edges.len();
        let max_edges = if node_count > 1 {
            node_count * (node_count - 1) / 2
        } else {
            0
        };
        let density = if max_edges > 0 {
            edge_count as f64 / max_edges as f64
        } else {
            0.0
        };
        let positive = edges
            .iter()
            .filter(|e| e.edge_type == EdgeType::Positive)
            .count();
        let positive_ratio = if edge_count > 0 {
            positive as f64 / edge_count as f64
        } else {
            0.0
        };
        let mean_degree = if node_count > 0 {
            2.0 * edge_count as f64 / node_count as f64
        } else {
            0.0
        };

        Self {
            node_count,
            edge_count,
            density,
            positive_ratio,
            mean_degree,
        }
    }
}

/// Thresholded correlation graph annotated with niche loadings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoOccurrenceNetwork {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub stats: NetworkStats,
}

impl CoOccurrenceNetwork {
    /// Edges incident to a taxon.
    pub fn edges_of<'a>(&'a self, taxon: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges
            .iter()
            .filter(move |e| e.source == taxon || e.target == taxon)
    }

    /// Look up a node by taxon.
    pub fn node(&self, taxon: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.taxon == taxon)
    }
}
