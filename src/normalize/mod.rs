//! Normalization of abundance tables.
//!
//! - **Relative**: pseudocount plus row-relative scaling (each taxon sums to 1)
//! - **CLR**: centered log-ratio transform removing the sum-to-one constraint

pub mod clr;
pub mod relative;

pub use clr::{clr_from_normalized, clr_transform, norm_clr, ClrMatrix, CLR_FLOOR};
pub use relative::normalize_abundance;
