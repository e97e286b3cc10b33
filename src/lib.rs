//! blocksig
//!
//! Per-block file signatures with bounded memory.
//!
//! `blocksig` splits a file into fixed-size blocks, hashes every block on a
//! pool of worker threads and writes one uppercase hex digest per line, in
//! block order, to a new destination file. It is the first half of a
//! delta-sync or integrity-check workflow:
//!
//! - compare two signatures to find changed blocks
//! - verify a copy block by block
//! - detect corruption in large files
//!
//! The pipeline is three stages connected by bounded queues:
//!
//! ```text
//! BlockReader -> [blocks] -> BlockHashStage x N -> [digests] -> HashWriter
//! ```
//!
//! Queues use high/low watermarks so blocked threads wake in batches rather
//! than on every item. Digests arrive out of order and are reassembled into
//! groups that are written with a single positioned write each.
//!
//! # Example
//!
//! ```no_run
//! use blocksig::{generate_signature, HashAlgorithm, SignatureConfig, SignatureError};
//!
//! fn main() -> Result<(), SignatureError> {
//!     let config = SignatureConfig::new(1024 * 1024)?.with_algorithm(HashAlgorithm::Md5);
//!     let summary = generate_signature("disk.img", "disk.sig", &config)?;
//!     println!("{} blocks, {} bytes of signature", summary.blocks, summary.output_size);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod block;
mod buffer;
mod config;
mod error;
mod hash;
mod pipeline;
mod queue;
mod stage;

//
// Public surface
//

pub use block::{Block, BlockHash};
pub use buffer::{GroupBuffer, GroupedWriter, RegionPool};
pub use config::{
    DEFAULT_BLOCK_SIZE, DEFAULT_GROUP_SIZE, DEFAULT_MAX_INPUT_SIZE, DEFAULT_WATERMARK,
    HashAlgorithm, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE, MemoryBudget, SignatureConfig,
    default_parallelism,
};
pub use error::{Result, SignatureError, StageError};
#[cfg(feature = "hash-blake3")]
pub use hash::Blake3Hasher;
pub use hash::{BlockHasher, INLINE_DIGEST_LEN, Md5Hasher};
pub use pipeline::{
    READER_STAGE, SignatureSummary, WRITER_STAGE, generate_signature, run_pipeline,
    validate_inputs,
};
pub use queue::HysteresisQueue;
pub use stage::{
    BlockHashStage, BlockReader, HashWriter, PipelineStage, Stage, StageReport, StageRunner,
};
