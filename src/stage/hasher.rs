//! Transform stage: blocks to digests.

use std::sync::Arc;

use tracing::debug;

use super::PipelineStage;
use crate::block::{Block, BlockHash};
use crate::error::Result;
use crate::hash::BlockHasher;
use crate::queue::HysteresisQueue;

/// Hashes blocks from a shared input queue into a shared output queue.
///
/// Several instances run side by side. Each registers as a producer on the
/// output queue when constructed, so the queue closes only after the last
/// instance stops.
#[derive(Debug)]
pub struct BlockHashStage<H> {
    input: Arc<HysteresisQueue<Block>>,
    output: Arc<HysteresisQueue<BlockHash>>,
    hasher: H,
    hashed: u64,
    started: bool,
    registered: bool,
}

impl<H: BlockHasher> BlockHashStage<H> {
    /// Creates a hashing stage and registers it as an output producer.
    pub fn new(
        input: Arc<HysteresisQueue<Block>>,
        output: Arc<HysteresisQueue<BlockHash>>,
        hasher: H,
    ) -> Self {
        output.register_producer();
        Self {
            input,
            output,
            hasher,
            hashed: 0,
            started: false,
            registered: true,
        }
    }
}

impl<H: BlockHasher> PipelineStage for BlockHashStage<H> {
    fn on_start(&mut self) -> Result<()> {
        self.started = true;
        debug!(digest_len = self.hasher.digest_len(), "Starting block hasher");
        Ok(())
    }

    fn do_work(&mut self) -> Result<bool> {
        let Some(block) = self.input.pop() else {
            return Ok(false);
        };
        let hash = self.hasher.hash_block(&block);
        self.hashed += 1;
        self.output.push(hash);
        Ok(true)
    }

    fn on_stop(&mut self) -> Result<()> {
        // A hasher that stops early must not leave the reader blocked on a
        // full queue; after a normal stop the input is already drained.
        let mut discarded = 0u64;
        if self.started {
            while self.input.pop().is_some() {
                discarded += 1;
            }
        }
        if self.registered {
            self.registered = false;
            self.output.unregister_producer();
        }
        debug!(hashed = self.hashed, discarded, "Stopped block hasher");
        Ok(())
    }
}
