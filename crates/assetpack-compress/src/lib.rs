//! AssetPack Compress - image compression stage
//!
//! Turns one PNG or JPEG asset into compressed derivatives, one per enabled
//! output format, for the assetpack pipeline.
//!
//! # Module Structure
//!
//! - `config` - user options, defaults, and resolution
//! - `predicate` - which assets the stage applies to
//! - `descriptor` - per-call description of the source image
//! - `codec` - encoder boundary and the `image`/`webp` adapter
//! - `encoder` - concurrent per-format fan-out with an all-or-nothing join
//! - `assembler` - derivative naming and asset construction
//! - `stage` - the [`Stage`](assetpack_core::Stage) implementation
//!
//! # Usage
//!
//! ```ignore
//! use assetpack_compress::{CompressConfig, CompressStage};
//! use assetpack_core::{run_stage_with_defaults, Asset};
//!
//! let stage = CompressStage::new(&CompressConfig::from_json(r#"{ "avif": false }"#)?);
//! let asset = Asset::new("assets/icon.png", std::fs::read("assets/icon.png")?);
//! let derivatives = run_stage_with_defaults(&stage, &asset).await?.into_assets();
//! ```

pub mod assembler;
pub mod codec;
pub mod config;
pub mod descriptor;
pub mod encoder;
pub mod error;
pub mod format;
pub mod predicate;
pub mod stage;

pub use assembler::{assemble, derive_filename};
pub use codec::{
    CodecError, EncodeOptions, GpuArtifact, GpuTextureCodec, ImageCodec, InertGpuCodec,
    RasterCodec, SourceImage,
};
pub use config::{
    resolve, CompressConfig, CompressDefaults, CompressOptions, ConfigError, ResolvedConfig,
    ResolvedFormats, Setting, Toggle,
};
pub use descriptor::{DescriptorError, ImageDescriptor};
pub use encoder::{EncodeError, EncodedVariant, FanOutEncoder, VariantFormat};
pub use error::{CompressError, TransformError};
pub use format::{RasterFormat, SourceFormat, SOURCE_EXTENSIONS};
pub use predicate::{is_applicable, NO_COMPRESS};
pub use stage::{CompressStage, STAGE_NAME};
