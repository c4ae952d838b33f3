//! Zero handling strategies for count data.

pub mod pseudocount;

pub use pseudocount::{add_pseudocount, validate_pseudocount};
