//! The Block type - one fixed-size piece of the source file.

use bytes::Bytes;
use std::fmt;

/// A fixed-size block read from the source.
///
/// The payload length is always the configured block size. A final short
/// read is zero-padded, never truncated, so every block of a file hashes
/// the same number of bytes.
///
/// # Example
///
/// ```
/// use blocksig::Block;
///
/// let block = Block::new(1, &b"e\0"[..]);
///
/// assert_eq!(block.position(), 1);
/// assert_eq!(block.size(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    position: u64,
    data: Bytes,
}

impl Block {
    /// Creates a block from a payload that already has the block size.
    pub fn new(position: u64, data: impl Into<Bytes>) -> Self {
        Self {
            position,
            data: data.into(),
        }
    }

    /// Returns the 0-based block index in the source.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns the payload length, which equals the configured block size.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns a reference to the payload.
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block(#{}, {} bytes)", self.position, self.size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let block = Block::new(3, &b"hello"[..]);
        assert_eq!(block.position(), 3);
        assert_eq!(block.size(), 5);
    }

    #[test]
    fn test_payload_is_shared() {
        let payload = Bytes::from(vec![1u8, 2, 0, 0]);
        let block = Block::new(2, payload.clone());
        assert_eq!(block.data(), &payload);
        assert_eq!(block.data().as_ptr(), payload.as_ptr());
    }

    #[test]
    fn test_display() {
        let block = Block::new(7, vec![0u8; 512]);
        let s = format!("{}", block);
        assert!(s.contains("#7"));
        assert!(s.contains("512 bytes"));
    }
}
