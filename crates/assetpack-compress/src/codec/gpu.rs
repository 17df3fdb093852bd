//! Extension point for GPU block-compressed texture variants.
//!
//! Nothing in this crate encodes GPU textures yet. The stage still treats
//! the `gpu` format as a first-class branch of the fan-out so a real codec
//! can be plugged in without touching the stage.

use std::path::Path;

use async_trait::async_trait;

use super::CodecError;
use crate::config::GpuOptions;

/// One compressed texture file produced for a source image.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuArtifact {
    /// Extension of the derivative, without the leading dot (e.g. `"bc7.dds"`).
    pub extension: String,
    pub buffer: Vec<u8>,
}

/// External GPU texture encoder.
#[async_trait]
pub trait GpuTextureCodec: Send + Sync {
    /// Encode the image at `path` into zero or more texture artifacts.
    async fn encode_gpu_texture(
        &self,
        path: &Path,
        options: &GpuOptions,
    ) -> Result<Vec<GpuArtifact>, CodecError>;
}

/// GPU codec that produces no artifacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct InertGpuCodec;

#[async_trait]
impl GpuTextureCodec for InertGpuCodec {
    async fn encode_gpu_texture(
        &self,
        path: &Path,
        options: &GpuOptions,
    ) -> Result<Vec<GpuArtifact>, CodecError> {
        tracing::debug!(
            path = %path.display(),
            bc7 = options.bc7.is_some(),
            astc = options.astc.is_some(),
            "GPU texture encoding is not available, skipping"
        );
        Ok(Vec::new())
    }
}
