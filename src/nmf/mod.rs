//! Non-negative matrix factorization into latent niches.

pub mod engine;
pub mod rank;

pub use engine::{nmf, reconstruction_error, NMF_EPSILON};
pub use rank::{select_rank, RankSelection, DEFAULT_MAX_RANK, MIN_AUTO_RANK};

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// NMF settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NmfConfig {
    /// Number of components (niches).
    pub k: usize,
    /// Iteration budget.
    pub max_iterations: usize,
    /// Relative residual change that counts as converged.
    pub tolerance: f64,
}

impl Default for NmfConfig {
    fn default() -> Self {
        Self {
            k: 2,
            max_iterations: 200,
            tolerance: 1e-4,
        }
    }
}

impl NmfConfig {
    /// Default settings with `k` components.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ..Default::default()
        }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Result of a factorization `V ≈ W H`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NmfResult {
    /// Loadings, taxa × k.
    pub w: DMatrix<f64>,
    /// Activations, k × samples.
    pub h: DMatrix<f64>,
    /// Final Frobenius residual `||V - WH||`.
    pub error: f64,
    /// Number of components.
    pub k: usize,
    /// Update iterations performed.
    pub iterations: usize,
    /// Whether the tolerance was reached within the budget.
    pub converged: bool,
}

impl NmfResult {
    /// The result for `k == 0` or an empty input.
    pub fn empty() -> Self {
        Self {
            w: DMatrix::zeros(0, 0),
            h: DMatrix::zeros(0, 0),
            error: 0.0,
            k: 0,
            iterations: 0,
            converged: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.k == 0
    }

    /// Loadings of one taxon across niches.
    pub fn loadings(&self, taxon: usize) -> Vec<f64> {
        if taxon < self.w.nrows() {
            self.w.row(taxon).iter().copied().collect()
        } else {
            Vec::new()
        }
    }

    /// Reconstructed matrix `W H`.
    pub fn reconstruction(&self) -> DMatrix<f64> {
        &self.w * &self.h
    }
}
