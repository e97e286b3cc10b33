//! MD5-based block hashing implementation.

use digest::Digest;

use super::BlockHasher;

/// A hasher that computes MD5 digests.
#[derive(Debug, Clone, Default)]
pub struct Md5Hasher {
    state: md5::Md5,
}

impl Md5Hasher {
    /// Size of an MD5 digest in bytes.
    pub const DIGEST_LEN: usize = 16;

    /// Creates a new hasher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience method to hash data in one shot.
    pub fn hash(data: &[u8]) -> [u8; 16] {
        md5::Md5::digest(data).into()
    }
}

impl BlockHasher for Md5Hasher {
    fn digest_len(&self) -> usize {
        Self::DIGEST_LEN
    }

    fn digest_into(&mut self, data: &[u8], out: &mut [u8]) {
        self.state.update(data);
        out.copy_from_slice(&self.state.finalize_reset());
    }
}
