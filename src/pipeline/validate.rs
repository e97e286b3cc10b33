//! Checks performed before any stage starts.

use std::fs;
use std::io;
use std::path::Path;

use tracing::warn;

use crate::config::SignatureConfig;
use crate::error::{Result, SignatureError};

/// Validates the run inputs and returns the source size.
///
/// Rejects an invalid configuration, a missing source, a source larger than
/// [`SignatureConfig::max_input_size`] and an existing destination. Nothing
/// is created on disk.
pub fn validate_inputs(input: &Path, output: &Path, config: &SignatureConfig) -> Result<u64> {
    config.validate().inspect_err(|e| warn!(error = %e, "Rejected configuration"))?;

    let size = match fs::metadata(input) {
        Ok(metadata) => metadata.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = %input.display(), "Input file does not exist");
            return Err(SignatureError::InputMissing {
                path: input.to_path_buf(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    if size > config.max_input_size() {
        warn!(size, max = config.max_input_size(), "Input file is too large");
        return Err(SignatureError::InputTooLarge {
            size,
            max: config.max_input_size(),
        });
    }

    if output.try_exists()? {
        warn!(path = %output.display(), "Output file already exists");
        return Err(SignatureError::OutputExists {
            path: output.to_path_buf(),
        });
    }

    Ok(size)
}
