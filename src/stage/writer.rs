//! Sink stage: digests to the destination file.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use super::PipelineStage;
use crate::block::BlockHash;
use crate::buffer::GroupedWriter;
use crate::error::{Result, SignatureError};
use crate::queue::HysteresisQueue;

/// Consumes digests in arbitrary order and writes them in block order.
///
/// The destination is created on start and never overwritten. See
/// [`GroupedWriter`] for the grouping and the end-of-stream check.
#[derive(Debug)]
pub struct HashWriter {
    path: PathBuf,
    group_size: usize,
    input: Arc<HysteresisQueue<BlockHash>>,
    writer: Option<GroupedWriter<File>>,
    started: bool,
}

impl HashWriter {
    /// Creates a writer for `path` batching `group_size` digests per write.
    pub fn new(
        path: impl Into<PathBuf>,
        group_size: usize,
        input: Arc<HysteresisQueue<BlockHash>>,
    ) -> Self {
        Self {
            path: path.into(),
            group_size,
            input,
            writer: None,
            started: false,
        }
    }
}

impl PipelineStage for HashWriter {
    fn on_start(&mut self) -> Result<()> {
        self.started = true;
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => SignatureError::OutputExists {
                    path: self.path.clone(),
                },
                _ => SignatureError::Io(e),
            })?;
        self.writer = Some(GroupedWriter::new(file, self.group_size));
        debug!(path = %self.path.display(), group_size = self.group_size, "Created output file");
        Ok(())
    }

    fn do_work(&mut self) -> Result<bool> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(false);
        };
        match self.input.pop() {
            Some(hash) => {
                writer.accept(&hash)?;
                Ok(true)
            }
            None => {
                writer.finish()?;
                Ok(false)
            }
        }
    }

    fn on_stop(&mut self) -> Result<()> {
        // Keep upstream hashers from blocking on a full queue when the
        // writer failed before end of stream.
        let mut discarded = 0u64;
        if self.started {
            while self.input.pop().is_some() {
                discarded += 1;
            }
        }
        let written = self
            .writer
            .take()
            .map_or(0, |writer| writer.bytes_written());
        debug!(bytes = written, discarded, "Closed output file");
        Ok(())
    }
}
