//! Error types for blocksig.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for signature operations.
pub type Result<T> = std::result::Result<T, SignatureError>;

/// Errors that can occur while generating a signature.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// An I/O error occurred while reading the source or writing the destination.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration parameter.
    #[error("invalid config: {message}")]
    InvalidConfig {
        /// Description of what was invalid.
        message: &'static str,
    },

    /// The requested block size is outside the supported range.
    #[error("block size {actual} is outside of allowed range: {min} - {max} bytes")]
    BlockSizeOutOfRange {
        /// The requested block size.
        actual: usize,
        /// Smallest accepted block size.
        min: usize,
        /// Largest accepted block size.
        max: usize,
    },

    /// The source file does not exist.
    #[error("input file {} does not exist", .path.display())]
    InputMissing {
        /// Path of the missing source.
        path: PathBuf,
    },

    /// The source file exceeds the configured maximum size.
    #[error("input file size {size} exceeds {max} bytes")]
    InputTooLarge {
        /// Actual size of the source.
        size: u64,
        /// Maximum accepted size.
        max: u64,
    },

    /// The destination already exists; it is never overwritten.
    #[error("output file {} already exists", .path.display())]
    OutputExists {
        /// Path of the existing destination.
        path: PathBuf,
    },

    /// A digest had a different encoded length than the ones before it.
    #[error("digest for block {position} is {actual} bytes long, expected {expected}")]
    DigestLengthMismatch {
        /// Block position of the offending digest.
        position: u64,
        /// Encoded length established by earlier digests.
        expected: usize,
        /// Encoded length of the offending digest.
        actual: usize,
    },

    /// End of stream was reached with more than one incomplete group.
    ///
    /// Some digest was lost or never produced upstream.
    #[error("work is done but {pending_groups} groups of digests are incomplete; some digests are missing")]
    MissingDigests {
        /// Number of groups still waiting for digests.
        pending_groups: usize,
    },

    /// The same block position was delivered twice.
    #[error("digest for block {position} was delivered more than once")]
    DuplicateDigest {
        /// Repeated block position.
        position: u64,
    },

    /// A pipeline stage failed.
    #[error(transparent)]
    StageFailed(#[from] Box<StageError>),

    /// A pipeline stage panicked.
    #[error("stage [{stage}] panicked")]
    StagePanicked {
        /// Name of the stage.
        stage: String,
    },

    /// A stage thread could not be started.
    #[error("failed to spawn stage [{stage}]: {source}")]
    SpawnFailed {
        /// Name of the stage.
        stage: String,
        /// Underlying OS error.
        source: std::io::Error,
    },
}

impl SignatureError {
    /// Returns true for errors detected before any stage starts.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            SignatureError::InvalidConfig { .. }
                | SignatureError::BlockSizeOutOfRange { .. }
                | SignatureError::InputMissing { .. }
                | SignatureError::InputTooLarge { .. }
                | SignatureError::OutputExists { .. }
        )
    }

    /// Returns true when the output is known to be missing digests.
    pub fn is_consistency_error(&self) -> bool {
        match self {
            SignatureError::MissingDigests { .. } | SignatureError::DuplicateDigest { .. } => true,
            SignatureError::StageFailed(stage) => stage.source.is_consistency_error(),
            _ => false,
        }
    }
}

/// A failure reported at a stage boundary.
#[derive(Debug, Error)]
#[error("stage [{stage}] failed: {source}")]
pub struct StageError {
    /// Name of the failed stage.
    pub stage: String,
    /// What went wrong.
    #[source]
    pub source: SignatureError,
}

impl StageError {
    /// Creates a stage error.
    pub fn new(stage: impl Into<String>, source: SignatureError) -> Self {
        Self {
            stage: stage.into(),
            source,
        }
    }
}

impl From<StageError> for SignatureError {
    fn from(e: StageError) -> Self {
        SignatureError::StageFailed(Box::new(e))
    }
}
