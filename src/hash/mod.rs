//! Digest functions applied to each block.
//!
//! The hashing stage is generic over [`BlockHasher`], so any fixed-size
//! digest can be plugged in.
//!
//! - [`Md5Hasher`] - MD5 via the `md-5` crate
//! - [`Blake3Hasher`] - BLAKE3 hash implementation (requires `hash-blake3` feature)

#[cfg(feature = "hash-blake3")]
mod blake3;
mod md5;

#[cfg(feature = "hash-blake3")]
pub use blake3::Blake3Hasher;
pub use md5::Md5Hasher;

use crate::block::{Block, BlockHash};

/// Largest digest [`BlockHasher::hash_block`] computes without allocating.
pub const INLINE_DIGEST_LEN: usize = 64;

/// A fixed-size digest function.
pub trait BlockHasher: Send {
    /// Length of the raw digest in bytes.
    fn digest_len(&self) -> usize;

    /// Hashes `data` and writes the raw digest into `out`.
    ///
    /// `out` is exactly [`digest_len`](Self::digest_len) bytes long.
    fn digest_into(&mut self, data: &[u8], out: &mut [u8]);

    /// Hashes the full payload of `block`, padding included.
    ///
    /// Digests up to [`INLINE_DIGEST_LEN`] bytes stay on the stack; longer
    /// ones are heap allocated.
    fn hash_block(&mut self, block: &Block) -> BlockHash {
        let len = self.digest_len();
        if len <= INLINE_DIGEST_LEN {
            let mut digest = [0u8; INLINE_DIGEST_LEN];
            self.digest_into(block.data(), &mut digest[..len]);
            BlockHash::from_digest(block.position(), &digest[..len])
        } else {
            let mut digest = vec![0u8; len];
            self.digest_into(block.data(), &mut digest);
            BlockHash::from_digest(block.position(), &digest)
        }
    }
}
