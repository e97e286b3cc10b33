//! Reassembles out-of-order digests into positioned group writes.

use std::collections::{BTreeMap, BTreeSet};
use std::collections::btree_map::Entry;
use std::io::{Seek, SeekFrom, Write};

use super::{GroupBuffer, RegionPool};
use crate::block::BlockHash;
use crate::error::{Result, SignatureError};

/// Turns randomly ordered digests into few, large, positioned writes.
///
/// Digest `p` belongs to group `p / group_size`, slot `p % group_size`. A
/// group is written at byte offset `group * group_size * line_width` as soon
/// as all its slots are filled, then discarded. At end of stream at most one
/// group (the trailing one) may still be incomplete; more than one means a
/// digest was lost upstream.
///
/// The record width is taken from the first digest seen; every later digest
/// must have the same length. A position delivered twice is rejected with
/// [`SignatureError::DuplicateDigest`], whether or not its group has
/// already been written.
///
/// # Example
///
/// ```
/// use blocksig::{BlockHash, GroupedWriter};
/// use std::io::Cursor;
///
/// let mut writer = GroupedWriter::new(Cursor::new(Vec::new()), 3);
/// writer.accept(&BlockHash::new(1, "CAFEBABE"))?;
/// writer.accept(&BlockHash::new(0, "DEADBEEF"))?;
/// writer.finish()?;
///
/// assert_eq!(writer.into_inner().into_inner(), b"DEADBEEF\nCAFEBABE\n");
/// # Ok::<(), blocksig::SignatureError>(())
/// ```
#[derive(Debug)]
pub struct GroupedWriter<W> {
    sink: W,
    group_size: usize,
    line_width: Option<usize>,
    groups: BTreeMap<u64, GroupBuffer>,
    /// Every group below this index has been written.
    written_below: u64,
    /// Written groups at or above `written_below`.
    written_ahead: BTreeSet<u64>,
    pool: RegionPool,
    accepted: u64,
    bytes_written: u64,
}

impl<W: Write + Seek> GroupedWriter<W> {
    /// Creates a writer batching `group_size` digests per write.
    pub fn new(sink: W, group_size: usize) -> Self {
        debug_assert!(group_size > 0, "group size must be at least 1");
        Self {
            sink,
            group_size,
            line_width: None,
            groups: BTreeMap::new(),
            written_below: 0,
            written_ahead: BTreeSet::new(),
            pool: RegionPool::default(),
            accepted: 0,
            bytes_written: 0,
        }
    }

    /// Places one digest, writing its group if that completes it.
    pub fn accept(&mut self, hash: &BlockHash) -> Result<()> {
        let line_width = self.check_width(hash)?;
        let group_size = self.group_size as u64;
        let index = hash.position() / group_size;
        let slot = (hash.position() % group_size) as usize;

        let duplicate = SignatureError::DuplicateDigest {
            position: hash.position(),
        };
        let already_written = self.is_written(index);
        let group = match self.groups.entry(index) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(_) if already_written => return Err(duplicate),
            Entry::Vacant(entry) => {
                let region = self.pool.take(line_width * self.group_size);
                entry.insert(GroupBuffer::new(region, line_width, self.group_size))
            }
        };
        if !group.insert(slot, hash.as_bytes()) {
            return Err(duplicate);
        }
        self.accepted += 1;

        if group.is_complete() {
            if let Some(group) = self.groups.remove(&index) {
                self.write_group(index, group.as_bytes())?;
                self.mark_written(index);
                self.pool.give(group.into_region());
            }
        }
        Ok(())
    }

    /// Flushes the trailing partial group at end of stream.
    ///
    /// Returns [`SignatureError::MissingDigests`] if more than one group is
    /// still incomplete, or if the only one has an empty slot before a
    /// filled one; nothing is written in either case.
    pub fn finish(&mut self) -> Result<()> {
        match self.groups.len() {
            0 => {}
            1 => {
                if let Some((index, group)) = self.groups.pop_first() {
                    let Some(records) = group.filled_prefix() else {
                        return Err(SignatureError::MissingDigests { pending_groups: 1 });
                    };
                    self.write_group(index, records)?;
                    self.mark_written(index);
                    self.pool.give(group.into_region());
                }
            }
            pending_groups => return Err(SignatureError::MissingDigests { pending_groups }),
        }
        self.sink.flush()?;
        Ok(())
    }

    /// Returns the number of digests accepted.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Returns the number of bytes written to the sink.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Returns the number of groups waiting for digests.
    pub fn pending_groups(&self) -> usize {
        self.groups.len()
    }

    /// Returns the record width once the first digest has been seen.
    pub fn line_width(&self) -> Option<usize> {
        self.line_width
    }

    /// Consumes the writer and returns the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }

    fn check_width(&mut self, hash: &BlockHash) -> Result<usize> {
        let actual = hash.len() + 1;
        match self.line_width {
            Some(expected) if expected != actual => Err(SignatureError::DigestLengthMismatch {
                position: hash.position(),
                expected: expected - 1,
                actual: hash.len(),
            }),
            Some(expected) => Ok(expected),
            None => {
                self.line_width = Some(actual);
                Ok(actual)
            }
        }
    }

    fn is_written(&self, index: u64) -> bool {
        index < self.written_below || self.written_ahead.contains(&index)
    }

    fn mark_written(&mut self, index: u64) {
        self.written_ahead.insert(index);
        while self.written_ahead.remove(&self.written_below) {
            self.written_below += 1;
        }
    }

    fn write_group(&mut self, index: u64, records: &[u8]) -> Result<()> {
        let line_width = self.line_width.unwrap_or_default() as u64;
        let offset = index * self.group_size as u64 * line_width;
        self.sink.seek(SeekFrom::Start(offset))?;
        self.sink.write_all(records)?;
        self.bytes_written += records.len() as u64;
        Ok(())
    }
}
