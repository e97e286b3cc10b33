//! Configuration for signature generation.
//!
//! - [`SignatureConfig`] - Block size, grouping, queue sizing and parallelism
//! - [`MemoryBudget`] - Memory limits used to derive queue capacities
//! - [`HashAlgorithm`] - Digest function applied to each block

use std::fmt;
use std::mem::size_of;
use std::str::FromStr;

use crate::block::{Block, BlockHash};
use crate::buffer::GroupBuffer;
use crate::error::SignatureError;

/// Smallest accepted block size (512 B).
pub const MIN_BLOCK_SIZE: usize = 512;

/// Largest accepted block size (10 MiB).
pub const MAX_BLOCK_SIZE: usize = 10 * 1024 * 1024;

/// Default block size (1 MiB).
pub const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024;

/// Default largest accepted source file (128 GiB).
pub const DEFAULT_MAX_INPUT_SIZE: u64 = 128 * 1024 * 1024 * 1024;

/// Default hysteresis watermark.
pub const DEFAULT_WATERMARK: f32 = 0.25;

/// Default number of digests per grouped write.
pub const DEFAULT_GROUP_SIZE: usize = 128;

/// Digest function applied to each block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    /// MD5, 16-byte digest.
    #[default]
    Md5,
    /// BLAKE3, 32-byte digest.
    #[cfg(feature = "hash-blake3")]
    Blake3,
}

impl HashAlgorithm {
    /// Length of the raw digest in bytes.
    pub const fn digest_len(self) -> usize {
        match self {
            HashAlgorithm::Md5 => 16,
            #[cfg(feature = "hash-blake3")]
            HashAlgorithm::Blake3 => 32,
        }
    }

    /// Length of one hex-encoded digest.
    pub const fn hex_len(self) -> usize {
        self.digest_len() * 2
    }

    /// Length of one output record: the hex digest plus a line terminator.
    pub const fn line_width(self) -> usize {
        self.hex_len() + 1
    }

    /// Lowercase name used on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            #[cfg(feature = "hash-blake3")]
            HashAlgorithm::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(HashAlgorithm::Md5),
            #[cfg(feature = "hash-blake3")]
            "blake3" => Ok(HashAlgorithm::Blake3),
            _ => Err(SignatureError::InvalidConfig {
                message: "unknown hash algorithm",
            }),
        }
    }
}

/// Memory limits that bound the in-flight data of a run.
///
/// Capacities derived from a budget never exceed `max_items_per_worker`
/// items per hashing worker, and the grouping factor never exceeds
/// `max_group_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBudget {
    /// Bytes available to blocks waiting in the block queue.
    pub block_bytes: usize,
    /// Bytes available to digests waiting in the digest queue.
    pub hash_bytes: usize,
    /// Bytes available to group buffers in the writer.
    pub write_bytes: usize,
    /// Upper bound on queued items per hashing worker.
    pub max_items_per_worker: usize,
    /// Upper bound on digests per grouped write.
    pub max_group_size: usize,
}

impl Default for MemoryBudget {
    fn default() -> Self {
        Self {
            block_bytes: 100 * 1024 * 1024,
            hash_bytes: 100 * 1024 * 1024,
            write_bytes: 128 * 1024,
            max_items_per_worker: 1024,
            max_group_size: DEFAULT_GROUP_SIZE,
        }
    }
}

/// Configuration for a signature run.
///
/// Defaults match [`MemoryBudget::default`] applied to a 1 MiB block size and
/// two hashing workers per CPU.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignatureConfig {
    block_size: usize,
    group_size: usize,
    block_queue_capacity: usize,
    hash_queue_capacity: usize,
    watermark: f32,
    parallelism: usize,
    max_input_size: u64,
    algorithm: HashAlgorithm,
}

impl SignatureConfig {
    /// Creates a configuration for the given block size.
    ///
    /// Queue capacities and the grouping factor are derived from the default
    /// [`MemoryBudget`]. Returns an error if the block size is out of range.
    pub fn new(block_size: usize) -> Result<Self, SignatureError> {
        check_block_size(block_size)?;
        Ok(Self::sized(
            block_size,
            default_parallelism(),
            HashAlgorithm::default(),
            &MemoryBudget::default(),
        ))
    }

    /// Creates a configuration whose queue capacities and grouping factor are
    /// derived from `budget`.
    pub fn with_budget(
        block_size: usize,
        parallelism: usize,
        algorithm: HashAlgorithm,
        budget: &MemoryBudget,
    ) -> Result<Self, SignatureError> {
        check_block_size(block_size)?;
        if parallelism == 0 {
            return Err(SignatureError::InvalidConfig {
                message: "parallelism must be at least 1",
            });
        }
        Ok(Self::sized(block_size, parallelism, algorithm, budget))
    }

    fn sized(
        block_size: usize,
        parallelism: usize,
        algorithm: HashAlgorithm,
        budget: &MemoryBudget,
    ) -> Self {
        let item_limit = budget.max_items_per_worker.saturating_mul(parallelism);
        let block_queue_capacity =
            (budget.block_bytes / (size_of::<Block>() + block_size)).min(item_limit);
        let hash_queue_capacity =
            (budget.hash_bytes / (size_of::<BlockHash>() + algorithm.hex_len())).min(item_limit);
        let group_size = (budget.write_bytes
            / ((size_of::<GroupBuffer>() + algorithm.line_width()) * parallelism))
            .clamp(1, budget.max_group_size.max(1));

        Self {
            block_size,
            group_size,
            block_queue_capacity: block_queue_capacity.max(1),
            hash_queue_capacity: hash_queue_capacity.max(1),
            watermark: DEFAULT_WATERMARK,
            parallelism,
            max_input_size: DEFAULT_MAX_INPUT_SIZE,
            algorithm,
        }
    }

    /// Sets the block size.
    pub fn with_block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    /// Sets the number of digests per grouped write.
    pub fn with_group_size(mut self, size: usize) -> Self {
        self.group_size = size;
        self
    }

    /// Sets the capacity of the block queue (0 = unbounded).
    pub fn with_block_queue_capacity(mut self, capacity: usize) -> Self {
        self.block_queue_capacity = capacity;
        self
    }

    /// Sets the capacity of the digest queue (0 = unbounded).
    pub fn with_hash_queue_capacity(mut self, capacity: usize) -> Self {
        self.hash_queue_capacity = capacity;
        self
    }

    /// Sets the hysteresis watermark, a fraction in (0, 1).
    pub fn with_watermark(mut self, watermark: f32) -> Self {
        self.watermark = watermark;
        self
    }

    /// Sets the number of hashing workers.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Sets the largest accepted source size in bytes.
    pub fn with_max_input_size(mut self, size: u64) -> Self {
        self.max_input_size = size;
        self
    }

    /// Sets the digest function.
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Returns the block size.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the number of digests per grouped write.
    pub fn group_size(&self) -> usize {
        self.group_size
    }

    /// Returns the capacity of the block queue.
    pub fn block_queue_capacity(&self) -> usize {
        self.block_queue_capacity
    }

    /// Returns the capacity of the digest queue.
    pub fn hash_queue_capacity(&self) -> usize {
        self.hash_queue_capacity
    }

    /// Returns the hysteresis watermark.
    pub fn watermark(&self) -> f32 {
        self.watermark
    }

    /// Returns the number of hashing workers.
    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Returns the largest accepted source size.
    pub fn max_input_size(&self) -> u64 {
        self.max_input_size
    }

    /// Returns the digest function.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Validates the current configuration.
    pub fn validate(&self) -> Result<(), SignatureError> {
        check_block_size(self.block_size)?;

        if self.group_size == 0 {
            return Err(SignatureError::InvalidConfig {
                message: "group size must be at least 1",
            });
        }

        if self.parallelism == 0 {
            return Err(SignatureError::InvalidConfig {
                message: "parallelism must be at least 1",
            });
        }

        if !(self.watermark > 0.0 && self.watermark < 1.0) {
            return Err(SignatureError::InvalidConfig {
                message: "watermark must be within (0, 1)",
            });
        }

        Ok(())
    }
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self::sized(
            DEFAULT_BLOCK_SIZE,
            default_parallelism(),
            HashAlgorithm::default(),
            &MemoryBudget::default(),
        )
    }
}

/// Two hashing workers per logical CPU.
pub fn default_parallelism() -> usize {
    (2 * num_cpus::get()).max(1)
}

fn check_block_size(block_size: usize) -> Result<(), SignatureError> {
    if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&block_size) {
        return Err(SignatureError::BlockSizeOutOfRange {
            actual: block_size,
            min: MIN_BLOCK_SIZE,
            max: MAX_BLOCK_SIZE,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SignatureConfig::default();
        assert_eq!(config.block_size(), DEFAULT_BLOCK_SIZE);
        assert_eq!(config.watermark(), DEFAULT_WATERMARK);
        assert_eq!(config.algorithm(), HashAlgorithm::Md5);
        assert!(config.parallelism() >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = SignatureConfig::default()
            .with_block_size(4096)
            .with_group_size(3)
            .with_parallelism(4)
            .with_watermark(0.5)
            .with_block_queue_capacity(10)
            .with_hash_queue_capacity(0);

        assert_eq!(config.block_size(), 4096);
        assert_eq!(config.group_size(), 3);
        assert_eq!(config.parallelism(), 4);
        assert_eq!(config.watermark(), 0.5);
        assert_eq!(config.block_queue_capacity(), 10);
        assert_eq!(config.hash_queue_capacity(), 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_block_size_bounds() {
        assert!(SignatureConfig::new(MIN_BLOCK_SIZE).is_ok());
        assert!(SignatureConfig::new(MAX_BLOCK_SIZE).is_ok());
        assert!(matches!(
            SignatureConfig::new(MIN_BLOCK_SIZE - 1),
            Err(SignatureError::BlockSizeOutOfRange { .. })
        ));
        assert!(SignatureConfig::new(MAX_BLOCK_SIZE + 1).is_err());
    }

    #[test]
    fn test_invalid_watermark() {
        let config = SignatureConfig::default().with_watermark(0.0);
        assert!(config.validate().is_err());
        let config = SignatureConfig::default().with_watermark(1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_group_size_and_parallelism() {
        assert!(SignatureConfig::default().with_group_size(0).validate().is_err());
        assert!(SignatureConfig::default().with_parallelism(0).validate().is_err());
        assert!(
            SignatureConfig::with_budget(4096, 0, HashAlgorithm::Md5, &MemoryBudget::default())
                .is_err()
        );
    }

    #[test]
    fn test_budget_caps_queue_capacity_per_worker() {
        let budget = MemoryBudget::default();
        let config = SignatureConfig::with_budget(512, 2, HashAlgorithm::Md5, &budget).unwrap();
        // 100 MiB of 512-byte blocks is far more than 1024 items per worker
        assert_eq!(config.block_queue_capacity(), 2048);
        assert_eq!(config.hash_queue_capacity(), 2048);
        assert!(config.group_size() >= 1);
        assert!(config.group_size() <= budget.max_group_size);
    }

    #[test]
    fn test_budget_limits_large_blocks() {
        let budget = MemoryBudget::default();
        let config =
            SignatureConfig::with_budget(MAX_BLOCK_SIZE, 64, HashAlgorithm::Md5, &budget).unwrap();
        assert!(config.block_queue_capacity() <= budget.block_bytes / MAX_BLOCK_SIZE);
        assert!(config.block_queue_capacity() >= 1);
    }

    #[test]
    fn test_tiny_write_budget_still_groups() {
        let budget = MemoryBudget {
            write_bytes: 1,
            ..MemoryBudget::default()
        };
        let config = SignatureConfig::with_budget(4096, 8, HashAlgorithm::Md5, &budget).unwrap();
        assert_eq!(config.group_size(), 1);
    }

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!("md5".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Md5);
        assert_eq!("MD5".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Md5);
        assert!("sha0".parse::<HashAlgorithm>().is_err());
        assert_eq!(HashAlgorithm::Md5.line_width(), 33);
    }

    #[cfg(feature = "hash-blake3")]
    #[test]
    fn test_blake3_widths() {
        assert_eq!("blake3".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Blake3);
        assert_eq!(HashAlgorithm::Blake3.hex_len(), 64);
    }
}
