//! TasteGraph: renders interaction graphs and taste communities
//!
//! This is the main entrypoint that orchestrates data loading, community
//! partitioning and plot generation.

use anyhow::Result;
use clap::Parser;
use std::time::Instant;
use tastegraph::{generate_visualization_report, load_dataset, Args};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    args.validate()?;

    if args.verbose {
        println!("TasteGraph - Interaction Graphs & Taste Communities");
        println!("===================================================\n");
    }

    run_pipeline(&args)
}

/// `RUST_LOG` wins; otherwise `--verbose` selects debug level
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run_pipeline(args: &Args) -> Result<()> {
    let start_time = Instant::now();

    if args.verbose {
        println!("Step 1: Loading datasets");
        println!("  Data directory: {}", args.data_dir.display());
    }

    let dataset = load_dataset(&args.data_dir)?;
    println!(
        "✓ Loaded: {} songs, {} artists, {} users",
        dataset.songs.len(),
        dataset.artists.len(),
        dataset.users.len()
    );

    if args.verbose {
        println!("\nStep 2: Generating visualizations");
        println!("  Similarity threshold: {}", args.similarity_threshold);
        println!("  Community threshold: {}", args.community_threshold);
        println!("  Output directory: {}", args.output_dir.display());
    }

    let written = generate_visualization_report(&dataset, &args.plot_settings(), &args.output_dir)?;

    println!("\n=== Pipeline Complete ===");
    println!("Total processing time: {:.2}s", start_time.elapsed().as_secs_f64());
    println!("Generated files:");
    for (i, path) in written.iter().enumerate() {
        println!("  {}. {}", i + 1, path.display());
    }

    Ok(())
}
