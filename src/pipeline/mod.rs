//! Signature pipeline orchestration.
//!
//! Wires one [`BlockReader`], N [`BlockHashStage`]s and one [`HashWriter`]
//! through two [`HysteresisQueue`]s, runs every stage on its own thread and
//! collects their outcomes:
//!
//! ```text
//! reader -> [block queue] -> hasher #0..#N-1 -> [digest queue] -> writer
//! ```

mod validate;

pub use validate::validate_inputs;

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

#[cfg(feature = "hash-blake3")]
use crate::hash::Blake3Hasher;
use crate::config::{HashAlgorithm, SignatureConfig};
use crate::error::{Result, SignatureError};
use crate::hash::{BlockHasher, Md5Hasher};
use crate::queue::HysteresisQueue;
use crate::stage::{BlockHashStage, BlockReader, HashWriter, Stage, StageReport, StageRunner};

/// Name of the producer stage.
pub const READER_STAGE: &str = "Input file reader";

/// Name of the sink stage.
pub const WRITER_STAGE: &str = "Output file writer";

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureSummary {
    /// Size of the source in bytes.
    pub input_size: u64,
    /// Number of blocks hashed.
    pub blocks: u64,
    /// Number of digests written.
    pub digests: u64,
    /// Size of the destination in bytes.
    pub output_size: u64,
    /// Wall time of the run.
    pub elapsed: Duration,
    /// Per-stage reports, writer first, reader last.
    pub stages: Vec<StageReport>,
}

/// Validates the inputs and writes the signature of `input` to `output`.
///
/// Setup errors are returned before any thread starts and before the
/// destination is created. Otherwise every stage runs to completion and the
/// most upstream stage failure, if any, is returned. A failed run may leave a
/// partial destination behind.
///
/// # Example
///
/// ```no_run
/// use blocksig::{generate_signature, SignatureConfig};
///
/// let config = SignatureConfig::new(4096)?;
/// let summary = generate_signature("data.bin", "data.sig", &config)?;
/// println!("{} blocks in {:?}", summary.blocks, summary.elapsed);
/// # Ok::<(), blocksig::SignatureError>(())
/// ```
pub fn generate_signature(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &SignatureConfig,
) -> Result<SignatureSummary> {
    let input = input.as_ref();
    let output = output.as_ref();
    let input_size = validate_inputs(input, output, config)?;

    let summary = match config.algorithm() {
        HashAlgorithm::Md5 => run_pipeline(input, output, config, Md5Hasher::new),
        #[cfg(feature = "hash-blake3")]
        HashAlgorithm::Blake3 => run_pipeline(input, output, config, Blake3Hasher::new),
    }?;

    Ok(SignatureSummary {
        input_size,
        ..summary
    })
}

/// Runs the pipeline with hashers built by `make_hasher`.
///
/// Only the configuration is validated here; the writer still refuses an
/// existing destination. `input_size` of the summary is left at 0.
pub fn run_pipeline<H, F>(
    input: &Path,
    output: &Path,
    config: &SignatureConfig,
    mut make_hasher: F,
) -> Result<SignatureSummary>
where
    H: BlockHasher + 'static,
    F: FnMut() -> H,
{
    config.validate()?;
    let started = Instant::now();

    info!("Generating file signature...");
    info!("Input file: {}", input.display());
    info!("Output file: {}", output.display());
    info!("Block size: {} bytes", config.block_size());
    debug!(
        block_queue = config.block_queue_capacity(),
        hash_queue = config.hash_queue_capacity(),
        group_size = config.group_size(),
        hashers = config.parallelism(),
        watermark = config.watermark(),
        "Pipeline sizing"
    );

    let blocks = Arc::new(HysteresisQueue::new(
        config.block_queue_capacity(),
        config.watermark(),
    ));
    let hashes = Arc::new(HysteresisQueue::new(
        config.hash_queue_capacity(),
        config.watermark(),
    ));

    // Every stage registers its queue production on construction, before any
    // thread runs, so no queue can close early.
    let mut runners: Vec<StageRunner<Stage<H>>> = Vec::with_capacity(config.parallelism() + 2);
    runners.push(StageRunner::new(
        WRITER_STAGE,
        HashWriter::new(output, config.group_size(), Arc::clone(&hashes)).into(),
    ));
    for i in 0..config.parallelism() {
        runners.push(StageRunner::new(
            format!("Hasher #{i}"),
            BlockHashStage::new(Arc::clone(&blocks), Arc::clone(&hashes), make_hasher()).into(),
        ));
    }
    runners.push(StageRunner::new(
        READER_STAGE,
        BlockReader::new(input, config.block_size(), Arc::clone(&blocks)).into(),
    ));

    let mut handles = Vec::with_capacity(runners.len());
    let mut spawn_error = None;
    let mut pending = runners.into_iter();
    for runner in pending.by_ref() {
        let name = runner.name().to_string();
        match runner.spawn() {
            Ok(handle) => handles.push((name, handle)),
            Err(e) => {
                error!(error = %e, "Aborting pipeline");
                spawn_error = Some(e);
                break;
            }
        }
    }
    // Stages that never got a thread stop here and release their queues
    drop(pending);

    let mut reports = Vec::with_capacity(handles.len());
    let mut failures = Vec::new();
    for (name, handle) in handles {
        match handle.join() {
            Ok(Ok(report)) => reports.push(report),
            Ok(Err(e)) => failures.push(SignatureError::from(e)),
            Err(_) => {
                error!(stage = %name, "Stage panicked");
                failures.push(SignatureError::StagePanicked { stage: name });
            }
        }
    }

    if let Some(e) = spawn_error {
        return Err(e);
    }
    // Stages were spawned downstream first, so the last failure is the most
    // upstream one and usually the root cause.
    if let Some(e) = failures.pop() {
        return Err(e);
    }

    let digests = reports
        .iter()
        .find(|r| r.name == WRITER_STAGE)
        .map_or(0, |r| r.units);
    let blocks = reports
        .iter()
        .filter(|r| r.name.starts_with("Hasher #"))
        .map(|r| r.units)
        .sum();
    let output_size = fs::metadata(output)?.len();
    let elapsed = started.elapsed();

    info!(blocks, output_size, ?elapsed, "Signature generated!");
    Ok(SignatureSummary {
        input_size: 0,
        blocks,
        digests,
        output_size,
        elapsed,
        stages: reports,
    })
}
