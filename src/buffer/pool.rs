//! Pool of group backing regions for memory reuse.

/// Default number of regions kept for reuse.
pub const DEFAULT_MAX_POOLED: usize = 16;

/// A free list of byte regions.
///
/// Groups complete in bursts while hashing workers race ahead of each other,
/// so the writer keeps a few regions around instead of reallocating one per
/// group.
#[derive(Debug)]
pub struct RegionPool {
    free: Vec<Vec<u8>>,
    max_pooled: usize,
}

impl RegionPool {
    /// Creates a pool keeping at most `max_pooled` idle regions.
    pub fn new(max_pooled: usize) -> Self {
        Self {
            free: Vec::new(),
            max_pooled,
        }
    }

    /// Takes a region from the pool or allocates a new one.
    ///
    /// The region is exactly `len` bytes long. Reused regions keep their
    /// previous contents.
    pub fn take(&mut self, len: usize) -> Vec<u8> {
        match self.free.pop() {
            Some(mut region) => {
                region.resize(len, 0);
                region
            }
            None => vec![0u8; len],
        }
    }

    /// Returns a region to the pool, dropping it if the pool is full.
    pub fn give(&mut self, region: Vec<u8>) {
        if self.free.len() < self.max_pooled {
            self.free.push(region);
        }
    }

    /// Returns the number of idle regions.
    pub fn idle(&self) -> usize {
        self.free.len()
    }
}

impl Default for RegionPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_POOLED)
    }
}
