//! Errors surfaced by the compression stage.

use std::path::PathBuf;

use thiserror::Error;

use crate::descriptor::DescriptorError;
use crate::encoder::EncodeError;

/// Why an asset could not be compressed.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Per-asset compression failure; no derivatives were produced.
#[derive(Debug, Error)]
#[error("[compress] Failed to compress image: {} - {source}", .path.display())]
pub struct CompressError {
    /// Source asset that failed.
    pub path: PathBuf,
    #[source]
    pub source: TransformError,
}

impl CompressError {
    pub fn new(path: impl Into<PathBuf>, source: impl Into<TransformError>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
        }
    }
}
