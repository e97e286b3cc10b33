//! BLAKE3-based block hashing implementation.

use super::BlockHasher;

/// A hasher that computes BLAKE3 hashes.
#[derive(Debug, Clone)]
pub struct Blake3Hasher {
    state: blake3::Hasher,
}

impl Blake3Hasher {
    /// Size of a BLAKE3 digest in bytes.
    pub const DIGEST_LEN: usize = 32;

    /// Creates a new hasher.
    pub fn new() -> Self {
        Self {
            state: blake3::Hasher::new(),
        }
    }

    /// Creates a new hasher with a key for keyed hashing.
    pub fn new_keyed(key: &[u8; 32]) -> Self {
        Self {
            state: blake3::Hasher::new_keyed(key),
        }
    }

    /// Convenience method to hash data in one shot.
    pub fn hash(data: &[u8]) -> [u8; 32] {
        blake3::hash(data).into()
    }
}

impl Default for Blake3Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockHasher for Blake3Hasher {
    fn digest_len(&self) -> usize {
        Self::DIGEST_LEN
    }

    fn digest_into(&mut self, data: &[u8], out: &mut [u8]) {
        // reset() keeps the key of a keyed hasher
        self.state.update(data);
        out.copy_from_slice(self.state.finalize().as_bytes());
        self.state.reset();
    }
}
