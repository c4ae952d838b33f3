//! Synthetic data generation for benchmarking and testing.

pub mod generate;

pub use generate::{
    generate_demo_abundance_table, generate_demo_dataset, habitat_name, DemoConfig, DemoDataset,
};
