//! A run of consecutive output records waiting to be written.

/// Line terminator of every output record.
pub const EOL: u8 = b'\n';

/// Accumulates `slots` consecutive records of `line_width` bytes each.
///
/// A record is the encoded digest followed by [`EOL`]. Slot `i` of group `g`
/// holds the digest of block `g * slots + i`.
#[derive(Debug)]
pub struct GroupBuffer {
    region: Vec<u8>,
    line_width: usize,
    filled: Vec<bool>,
    missing: usize,
}

impl GroupBuffer {
    /// Creates an empty group on top of `region`.
    ///
    /// `region` must be exactly `slots * line_width` bytes long.
    pub fn new(region: Vec<u8>, line_width: usize, slots: usize) -> Self {
        debug_assert!(line_width > 0 && slots > 0);
        debug_assert_eq!(region.len(), line_width * slots);
        Self {
            region,
            line_width,
            filled: vec![false; slots],
            missing: slots,
        }
    }

    /// Copies `digest` into `slot` and terminates the record.
    ///
    /// Returns `false`, leaving the group untouched, if `slot` already holds
    /// a digest. `digest` must be `line_width - 1` bytes long.
    pub fn insert(&mut self, slot: usize, digest: &[u8]) -> bool {
        debug_assert_eq!(digest.len() + 1, self.line_width);
        if self.filled[slot] {
            return false;
        }

        let start = slot * self.line_width;
        let end = start + digest.len();
        self.region[start..end].copy_from_slice(digest);
        self.region[end] = EOL;
        self.filled[slot] = true;
        self.missing -= 1;
        true
    }

    /// Returns the number of slots still waiting for a digest.
    pub fn missing(&self) -> usize {
        self.missing
    }

    /// Returns true once every slot is filled.
    pub fn is_complete(&self) -> bool {
        self.missing == 0
    }

    /// Returns the width of one record.
    pub fn line_width(&self) -> usize {
        self.line_width
    }

    /// Returns the number of slots.
    pub fn slots(&self) -> usize {
        self.filled.len()
    }

    /// Returns the records of the filled slots if they are exactly the
    /// leading ones, as in the trailing group of a dense stream.
    ///
    /// Returns `None` when an empty slot precedes a filled one.
    pub fn filled_prefix(&self) -> Option<&[u8]> {
        let count = self.slots() - self.missing;
        if self.filled[..count].iter().all(|&f| f) {
            Some(&self.region[..count * self.line_width])
        } else {
            None
        }
    }

    /// Returns the whole backing region.
    pub fn as_bytes(&self) -> &[u8] {
        &self.region
    }

    /// Releases the backing region.
    pub fn into_region(self) -> Vec<u8> {
        self.region
    }
}
