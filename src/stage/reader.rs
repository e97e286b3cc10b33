//! Producer stage: source file to blocks.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;
use std::sync::Arc;

use bytes::BytesMut;
use tracing::debug;

use super::PipelineStage;
use crate::block::Block;
use crate::error::Result;
use crate::queue::HysteresisQueue;

/// Read-ahead buffer of the source (1 MiB).
pub const IO_BUFFER_SIZE: usize = 1024 * 1024;

/// Reads the source sequentially and publishes position-tagged blocks.
///
/// Every block is exactly `block_size` bytes; the final short read is
/// zero-padded.
#[derive(Debug)]
pub struct BlockReader {
    path: PathBuf,
    block_size: usize,
    output: Arc<HysteresisQueue<Block>>,
    reader: Option<BufReader<File>>,
    position: u64,
    registered: bool,
}

impl BlockReader {
    /// Creates a reader for `path` and registers it as the output producer.
    ///
    /// The source is not opened until the stage starts.
    pub fn new(
        path: impl Into<PathBuf>,
        block_size: usize,
        output: Arc<HysteresisQueue<Block>>,
    ) -> Self {
        output.register_producer();
        Self {
            path: path.into(),
            block_size,
            output,
            reader: None,
            position: 0,
            registered: true,
        }
    }
}

impl PipelineStage for BlockReader {
    fn on_start(&mut self) -> Result<()> {
        let file = File::open(&self.path)?;
        self.reader = Some(BufReader::with_capacity(IO_BUFFER_SIZE, file));
        debug!(path = %self.path.display(), block_size = self.block_size, "Opened input file");
        Ok(())
    }

    fn do_work(&mut self) -> Result<bool> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(false);
        };

        // Bytes past a short read stay zero, which is the padding
        let mut data = BytesMut::zeroed(self.block_size);
        let filled = read_full(reader, &mut data)?;
        if filled == 0 {
            return Ok(false);
        }

        let block = Block::new(self.position, data.freeze());
        self.position += 1;
        self.output.push(block);

        Ok(filled == self.block_size)
    }

    fn on_stop(&mut self) -> Result<()> {
        self.reader = None;
        if self.registered {
            self.registered = false;
            self.output.unregister_producer();
        }
        debug!(blocks = self.position, "Closed input file");
        Ok(())
    }
}

/// Reads until `buf` is full or the source is exhausted.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
