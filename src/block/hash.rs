//! Block digest types.

use std::fmt;

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// The encoded digest of one block.
///
/// The value is stored in its output encoding (uppercase hex) so the writer
/// can copy it straight into a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockHash {
    position: u64,
    hex: String,
}

impl BlockHash {
    /// Creates a digest from an already encoded value.
    pub fn new(position: u64, hex: impl Into<String>) -> Self {
        Self {
            position,
            hex: hex.into(),
        }
    }

    /// Creates a digest by hex-encoding raw digest bytes.
    pub fn from_digest(position: u64, digest: &[u8]) -> Self {
        Self {
            position,
            hex: to_hex(digest),
        }
    }

    /// Returns the position of the block this digest was computed from.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns the encoded digest.
    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Returns the encoded digest as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.hex.as_bytes()
    }

    /// Returns the encoded length.
    pub fn len(&self) -> usize {
        self.hex.len()
    }

    /// Returns true if the encoded digest is empty.
    pub fn is_empty(&self) -> bool {
        self.hex.is_empty()
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.hex, self.position)
    }
}

/// Encodes bytes as uppercase hex.
pub(crate) fn to_hex(bytes: &[u8]) -> String {
    let mut result = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        result.push(HEX[(byte >> 4) as usize] as char);
        result.push(HEX[(byte & 0xf) as usize] as char);
    }
    result
}
