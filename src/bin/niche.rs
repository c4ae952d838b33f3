//! niche - co-occurrence and niche discovery CLI
//!
//! Command-line interface for profiling taxon niches from abundance tables.

use clap::{Parser, Subcommand};
use composable_niche::data::{AbundanceTable, SampleMetadata};
use composable_niche::error::Result;
use composable_niche::niche::{profile_niches, NicheConfig};
use composable_niche::rng::Xorshift64;
use composable_niche::synthetic::{generate_demo_dataset, DemoConfig};
use std::path::PathBuf;

/// Co-occurrence networks and niche profiles from metagenomic abundance tables
#[derive(Parser, Debug)]
#[command(name = "niche")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the network and niche profiles for an abundance table
    Analyze {
        /// Path to abundance table TSV (taxa x samples)
        #[arg(short = 'c', long)]
        counts: PathBuf,

        /// Path to sample metadata TSV with a habitat column
        #[arg(short, long)]
        metadata: Option<PathBuf>,

        /// Path to analysis configuration YAML
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of niches (overrides config; 0 selects automatically)
        #[arg(short = 'k', long)]
        niches: Option<usize>,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Output path for the analysis JSON
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Generate a synthetic abundance table with planted niches
    Demo {
        /// Number of taxa
        #[arg(long, default_value = "20")]
        taxa: usize,

        /// Number of samples
        #[arg(long, default_value = "12")]
        samples: usize,

        /// Number of latent niches
        #[arg(long, default_value = "3")]
        niches: usize,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write an example analysis configuration
    ExampleConfig {
        /// Output path for configuration YAML
        #[arg(short, long, default_value = "niche.yaml")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_level = cli
        .log_level
        .parse::<log::LevelFilter>()
        .unwrap_or_else(|_| {
            eprintln!(
                "Warning: Invalid log level '{}' provided. Defaulting to Info.",
                cli.log_level
            );
            log::LevelFilter::Info
        });
    env_logger::Builder::new().filter_level(log_level).init();

    let result = match cli.command {
        Commands::Analyze {
            counts,
            metadata,
            config,
            niches,
            seed,
            output,
        } => cmd_analyze(&counts, metadata.as_ref(), config.as_ref(), niches, seed, &output),

        Commands::Demo {
            taxa,
            samples,
            niches,
            seed,
            output,
        } => cmd_demo(taxa, samples, niches, seed, &output),

        Commands::ExampleConfig { output } => cmd_example_config(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Run the full analysis and write JSON
fn cmd_analyze(
    counts_path: &PathBuf,
    metadata_path: Option<&PathBuf>,
    config_path: Option<&PathBuf>,
    niches: Option<usize>,
    seed: u64,
    output_path: &PathBuf,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => {
            log::info!("Loading configuration from {:?}", path);
            NicheConfig::from_file(path)?
        }
        None => NicheConfig::default(),
    };
    if let Some(k) = niches {
        config = config.with_num_niches(k);
    }

    let table = AbundanceTable::from_tsv(counts_path)?;
    let metadata = metadata_path.map(SampleMetadata::from_tsv).transpose()?;
    log::info!(
        "Loaded {} taxa x {} samples",
        table.n_taxa(),
        table.n_samples()
    );

    let mut rng = Xorshift64::new(seed);
    let analysis = profile_niches(&table, metadata.as_ref(), &config, &mut rng)?;

    std::fs::write(output_path, analysis.to_json()?)?;

    let stats = &analysis.network.stats;
    eprintln!("Wrote analysis to {:?}", output_path);
    eprintln!("  niches: {}", analysis.k);
    eprintln!(
        "  network: {} nodes, {} edges, density {:.3}, {:.1}% positive",
        stats.node_count,
        stats.edge_count,
        stats.density,
        stats.positive_ratio * 100.0
    );
    for (niche, members) in analysis.members().iter().enumerate() {
        eprintln!("  niche {}: {} taxa", niche, members.len());
    }

    Ok(())
}

/// Generate a synthetic dataset
fn cmd_demo(taxa: usize, samples: usize, niches: usize, seed: u64, output_dir: &PathBuf) -> Result<()> {
    let config = DemoConfig::new(taxa, samples, niches);
    let mut rng = Xorshift64::new(seed);
    let dataset = generate_demo_dataset(&config, &mut rng)?;
    dataset.write_to_dir(output_dir)?;

    eprintln!(
        "Wrote {} taxa x {} samples ({} niches) to {:?}",
        taxa, samples, niches, output_dir
    );
    Ok(())
}

fn cmd_example_config(output_path: &PathBuf) -> Result<()> {
    let yaml = NicheConfig::default().to_yaml()?;
    std::fs::write(output_path, &yaml)?;
    eprintln!("Wrote example configuration to {:?}", output_path);
    eprintln!();
    eprintln!("Contents:");
    println!("{}", yaml);
    Ok(())
}
