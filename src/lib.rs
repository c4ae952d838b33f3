//! Composable Co-Occurrence and Niche Discovery Library
//!
//! This library provides modular primitives for inferring ecological niches
//! of taxa (e.g. bacteriophages) from metagenomic abundance tables.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (AbundanceTable, SampleMetadata)
//! - **zero**: Zero handling strategies (pseudocount)
//! - **normalize**: Relative abundance and CLR transforms
//! - **correlate**: Compositionally robust basis correlation with p-values
//! - **correct**: Multiple testing correction (Benjamini-Hochberg)
//! - **nmf**: Non-negative matrix factorization and rank selection
//! - **network**: Co-occurrence network construction
//! - **niche**: Niche profiling (weights, confidence, stability, habitats)
//! - **synthetic**: Synthetic tables with planted niche structure
//! - **rng**: Injectable random sources
//!
//! # Example
//!
//! ```no_run
//! use composable_niche::prelude::*;
//!
//! let table = AbundanceTable::from_tsv("counts.tsv").unwrap();
//! let metadata = SampleMetadata::from_tsv("metadata.tsv").unwrap();
//!
//! let config = NicheConfig::default().with_num_niches(3);
//! let mut rng = Xorshift64::new(42);
//! let analysis = profile_niches(&table, Some(&metadata), &config, &mut rng).unwrap();
//!
//! for profile in &analysis.profiles {
//!     println!("{}\tniche {}\t{:.2}", profile.taxon, profile.primary_niche, profile.niche_confidence);
//! }
//! ```

pub mod correct;
pub mod correlate;
pub mod data;
pub mod error;
pub mod network;
pub mod niche;
pub mod nmf;
pub mod normalize;
pub mod rng;
pub mod synthetic;
pub mod zero;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::correct::bh::correct_bh;
    pub use crate::correlate::{
        basis_correlation, correlation_pvalues, pearson_correlation, BasisCorrelationConfig,
        CorrelationMatrix, CorrelationMethod,
    };
    pub use crate::data::{AbundanceTable, SampleMetadata, SampleRecord};
    pub use crate::error::{NicheError, Result};
    pub use crate::network::{
        build_network, CoOccurrenceNetwork, Edge, EdgeType, NetworkConfig, NetworkStats, Node,
    };
    pub use crate::niche::{
        associated_habitats, bootstrap_stability, niche_confidence, niche_weights, primary_niche,
        profile_niches, NicheAnalysis, NicheConfig, NicheProfile,
    };
    pub use crate::nmf::{nmf, select_rank, NmfConfig, NmfResult, RankSelection};
    pub use crate::normalize::{clr_transform, norm_clr, normalize_abundance, ClrMatrix};
    pub use crate::rng::{RandomSource, Xorshift64};
    pub use crate::synthetic::{
        generate_demo_abundance_table, generate_demo_dataset, DemoConfig, DemoDataset,
    };
    pub use crate::zero::pseudocount::add_pseudocount;
}
