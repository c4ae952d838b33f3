//! Input data structures: abundance tables and sample metadata.

mod abundance_table;
mod metadata;

pub use abundance_table::AbundanceTable;
pub use metadata::{SampleMetadata, SampleRecord};
