//! Encoder boundary for the compression stage.
//!
//! The stage never touches pixels itself. It hands the shared
//! [`SourceImage`] and one [`EncodeOptions`] per enabled format to a
//! [`RasterCodec`], and (when the GPU branch is on) the asset path to a
//! [`GpuTextureCodec`].
//!
//! - [`ImageCodec`] - raster encoding over the `image` and `webp` crates
//! - [`InertGpuCodec`] - placeholder GPU codec that produces nothing

mod gpu;
mod raster;
mod source;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{AvifOptions, JpgOptions, PngOptions, WebpOptions};
use crate::format::RasterFormat;

pub use self::gpu::{GpuArtifact, GpuTextureCodec, InertGpuCodec};
pub use self::raster::{encode_blocking, encode_image, ImageCodec};
pub use self::source::SourceImage;

/// Errors reported by codecs.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The source buffer could not be decoded.
    #[error("Failed to decode source image: {0}")]
    Decode(String),

    /// The encoder rejected the image or failed while writing.
    #[error("{format} encoding failed: {message}")]
    Encode { format: String, message: String },

    /// The codec cannot produce this format.
    #[error("{0} encoding is not supported by this codec")]
    Unsupported(String),

    /// The codec reported success but returned no bytes.
    #[error("{0} encoder produced an empty buffer")]
    EmptyOutput(String),

    /// The encode task did not run to completion.
    #[error("Encode task aborted: {0}")]
    Aborted(String),
}

/// Options for one raster encode task; the variant selects the format.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeOptions {
    Png(PngOptions),
    Jpg(JpgOptions),
    Webp(WebpOptions),
    Avif(AvifOptions),
}

impl EncodeOptions {
    pub fn format(&self) -> RasterFormat {
        match self {
            EncodeOptions::Png(_) => RasterFormat::Png,
            EncodeOptions::Jpg(_) => RasterFormat::Jpg,
            EncodeOptions::Webp(_) => RasterFormat::Webp,
            EncodeOptions::Avif(_) => RasterFormat::Avif,
        }
    }
}

/// External raster encoder.
///
/// Implementations must be shareable across assets; the stage calls
/// `encode_raster` concurrently, once per enabled format.
#[async_trait]
pub trait RasterCodec: Send + Sync {
    /// Re-encode `source` into the format selected by `options`.
    ///
    /// Every task of one asset receives a clone of the same `source`.
    async fn encode_raster(
        &self,
        source: SourceImage,
        options: EncodeOptions,
    ) -> Result<Vec<u8>, CodecError>;
}
