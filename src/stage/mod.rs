//! Pipeline stages and their runner.
//!
//! A stage is a unit of work invoked repeatedly until its input runs out.
//! The pipeline has exactly three kinds, modelled as the closed [`Stage`]
//! enum:
//!
//! - [`BlockReader`] - reads the source into fixed-size blocks
//! - [`BlockHashStage`] - hashes blocks (replicated on N threads)
//! - [`HashWriter`] - reorders digests and writes them in groups
//!
//! [`StageRunner`] drives one stage on its own thread and turns failures into
//! [`StageError`](crate::StageError) values instead of tearing down siblings.

mod hasher;
mod reader;
mod runner;
mod writer;

pub use hasher::BlockHashStage;
pub use reader::BlockReader;
pub use runner::{StageReport, StageRunner};
pub use writer::HashWriter;

use crate::error::Result;
use crate::hash::BlockHasher;

/// A unit of work driven by a [`StageRunner`].
///
/// The runner calls [`on_start`](Self::on_start) once,
/// [`do_work`](Self::do_work) until it returns `false` or fails, then
/// [`on_stop`](Self::on_stop) exactly once on every exit path.
pub trait PipelineStage {
    /// Acquires resources such as open files.
    fn on_start(&mut self) -> Result<()>;

    /// Performs one unit of work. Returns `false` when there is no more input.
    fn do_work(&mut self) -> Result<bool>;

    /// Releases resources. Must be safe to call after a failed start.
    fn on_stop(&mut self) -> Result<()>;
}

/// The stages of a signature pipeline.
#[derive(Debug)]
pub enum Stage<H> {
    /// Producer: source file to blocks.
    Reader(BlockReader),
    /// Transform: blocks to digests.
    Hasher(BlockHashStage<H>),
    /// Sink: digests to the destination file.
    Writer(HashWriter),
}

impl<H: BlockHasher> PipelineStage for Stage<H> {
    fn on_start(&mut self) -> Result<()> {
        match self {
            Stage::Reader(stage) => stage.on_start(),
            Stage::Hasher(stage) => stage.on_start(),
            Stage::Writer(stage) => stage.on_start(),
        }
    }

    fn do_work(&mut self) -> Result<bool> {
        match self {
            Stage::Reader(stage) => stage.do_work(),
            Stage::Hasher(stage) => stage.do_work(),
            Stage::Writer(stage) => stage.do_work(),
        }
    }

    fn on_stop(&mut self) -> Result<()> {
        match self {
            Stage::Reader(stage) => stage.on_stop(),
            Stage::Hasher(stage) => stage.on_stop(),
            Stage::Writer(stage) => stage.on_stop(),
        }
    }
}

impl<H> From<BlockReader> for Stage<H> {
    fn from(stage: BlockReader) -> Self {
        Stage::Reader(stage)
    }
}

impl<H> From<BlockHashStage<H>> for Stage<H> {
    fn from(stage: BlockHashStage<H>) -> Self {
        Stage::Hasher(stage)
    }
}

impl<H> From<HashWriter> for Stage<H> {
    fn from(stage: HashWriter) -> Self {
        Stage::Writer(stage)
    }
}
