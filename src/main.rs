//! pairsift: remove ligation artifacts from BEDPE interaction pairs.
//!
//! Usage: pairsift <BEDPE> <OUTPUT> -r <SITES> [OPTIONS]

use clap::Parser;
use std::path::PathBuf;
use std::process;

use pairsift::bedpe::BedpeError;
use pairsift::commands::{NoiseReduceCommand, DEFAULT_CHUNK_SIZE};
use pairsift::sites::SiteIndex;

#[derive(Parser)]
#[command(name = "pairsift")]
#[command(version)]
#[command(
    about = "Remove self-ligation and re-ligation artifacts from BEDPE interaction pairs",
    long_about = None
)]
struct Cli {
    /// Input BEDPE file
    bedpe: PathBuf,

    /// Output prefix; writes <OUTPUT>, <OUTPUT>.sel and <OUTPUT>.re
    output: PathBuf,

    /// BED file with the positions of all restriction sites in the genome
    #[arg(short = 'r', long)]
    restriction: PathBuf,

    /// Number of worker threads
    #[arg(short = 'p', long, default_value_t = 1)]
    processes: usize,

    /// Pair span threshold; pairs spanning more are kept without fragment
    /// lookup. Use -1 to force lookup on every pair.
    #[arg(
        short = 's',
        long,
        default_value_t = 1000,
        allow_hyphen_values = true
    )]
    threshold_span: i64,

    /// Records per work batch
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Print run statistics to stderr
    #[arg(long)]
    stats: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), BedpeError> {
    let sites = SiteIndex::from_bed_path(&cli.restriction)?;

    let max_span = if cli.threshold_span < 0 {
        None
    } else {
        Some(cli.threshold_span as u64)
    };

    let cmd = NoiseReduceCommand::new()
        .with_workers(cli.processes)
        .with_chunk_size(cli.chunk_size)
        .with_max_span(max_span);

    let stats = cmd.run(&cli.bedpe, &cli.output, &sites)?;

    if cli.stats {
        eprintln!(
            "{} ({} chromosomes, {} sites)",
            stats,
            sites.len(),
            sites.total_sites()
        );
    }

    Ok(())
}
