use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use blocksig::{
    DEFAULT_BLOCK_SIZE, HashAlgorithm, MemoryBudget, SignatureConfig, default_parallelism,
    generate_signature,
};

/// Generate a per-block signature of a file.
///
/// The input is split into blocks of BLOCK_SIZE bytes (the last one
/// zero-padded), every block is hashed and the digests are written to OUTPUT
/// as uppercase hex, one per line, in block order.
#[derive(Debug, Parser)]
#[command(name = "blocksig", version, about, long_about = None)]
struct Args {
    /// File to sign
    input: PathBuf,

    /// Signature file to create (must not exist)
    output: PathBuf,

    /// Block size in bytes, 512 to 10485760
    #[arg(default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: usize,

    /// Number of hashing threads [default: 2 x CPUs]
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Digests batched into one write [default: derived from memory budget]
    #[arg(short, long)]
    group_size: Option<usize>,

    /// Digest function
    #[arg(short, long, default_value = "md5")]
    algorithm: HashAlgorithm,

    /// Queue wakeup watermark, within (0, 1)
    #[arg(short, long)]
    watermark: Option<f32>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> anyhow::Result<()> {
    let parallelism = args.threads.unwrap_or_else(default_parallelism);
    let mut config = SignatureConfig::with_budget(
        args.block_size,
        parallelism,
        args.algorithm,
        &MemoryBudget::default(),
    )
    .context("Invalid parameters")?;
    if let Some(group_size) = args.group_size {
        config = config.with_group_size(group_size);
    }
    if let Some(watermark) = args.watermark {
        config = config.with_watermark(watermark);
    }

    let summary = generate_signature(&args.input, &args.output, &config).with_context(|| {
        format!(
            "Failed to generate signature of {}",
            args.input.display()
        )
    })?;

    info!(
        input_size = summary.input_size,
        blocks = summary.blocks,
        output_size = summary.output_size,
        elapsed = ?summary.elapsed,
        "Done"
    );
    Ok(())
}
