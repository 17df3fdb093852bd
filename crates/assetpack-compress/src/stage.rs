//! The compression stage as registered with the pipeline.

use std::sync::Arc;

use assetpack_core::{Asset, Stage, Tag};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::assembler::assemble;
use crate::codec::{GpuTextureCodec, ImageCodec, InertGpuCodec, RasterCodec};
use crate::config::{resolve, CompressConfig, CompressDefaults, ConfigError, ResolvedConfig};
use crate::descriptor::ImageDescriptor;
use crate::encoder::FanOutEncoder;
use crate::error::CompressError;
use crate::predicate::{is_applicable, NO_COMPRESS};

/// Name the stage registers under.
pub const STAGE_NAME: &str = "compress";

/// Produces compressed PNG/JPEG/WebP/AVIF derivatives of raster images.
///
/// Configuration is resolved once here; every call then works from the
/// resolved options the pipeline passes back.
#[derive(Clone)]
pub struct CompressStage {
    options: ResolvedConfig,
    encoder: FanOutEncoder,
}

impl CompressStage {
    /// Stage backed by the `image` crate encoders.
    pub fn new(config: &CompressConfig) -> Self {
        Self::with_codecs(config, Arc::new(ImageCodec), Arc::new(InertGpuCodec))
    }

    pub fn with_codecs(
        config: &CompressConfig,
        raster: Arc<dyn RasterCodec>,
        gpu: Arc<dyn GpuTextureCodec>,
    ) -> Self {
        let options = resolve(config, &CompressDefaults::default());
        match options.formats() {
            Some(formats) => debug!(
                formats = ?formats.enabled_formats(),
                gpu = formats.gpu.is_enabled(),
                "compress stage configured"
            ),
            None => debug!("compress stage disabled"),
        }

        Self {
            options,
            encoder: FanOutEncoder::new(raster, gpu),
        }
    }

    /// Stage configured from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(&CompressConfig::from_json(json)?))
    }

    pub fn options(&self) -> &ResolvedConfig {
        &self.options
    }

    /// Compress `asset` into every format enabled in `options`.
    ///
    /// Returns no derivatives when the stage is off or the asset itself
    /// carries the skip tag. On failure nothing is returned and `asset` is
    /// left as it was.
    #[tracing::instrument(name = "compress", skip_all, fields(path = %asset.path().display()))]
    pub async fn compress(
        &self,
        asset: &Asset,
        options: &ResolvedConfig,
    ) -> Result<Vec<Asset>, CompressError> {
        let formats = match options.formats() {
            Some(formats) if !asset.metadata().is_set(NO_COMPRESS) => formats,
            _ => {
                debug!("compression not requested, passing through");
                return Ok(Vec::new());
            }
        };

        let descriptor =
            ImageDescriptor::from_asset(asset).map_err(|e| CompressError::new(asset.path(), e))?;

        let variants = self
            .encoder
            .encode(asset.path(), &descriptor, formats)
            .await
            .map_err(|e| {
                warn!(error = %e, "compression failed");
                CompressError::new(asset.path(), e)
            })?;

        let derivatives = assemble(asset, variants, NO_COMPRESS);
        info!(count = derivatives.len(), "compressed image");

        Ok(derivatives)
    }
}

#[async_trait]
impl Stage for CompressStage {
    type Options = ResolvedConfig;
    type Error = CompressError;

    fn name(&self) -> &'static str {
        STAGE_NAME
    }

    fn tags(&self) -> &[Tag] {
        &[NO_COMPRESS]
    }

    fn default_options(&self) -> &ResolvedConfig {
        &self.options
    }

    fn test(&self, asset: &Asset, options: &ResolvedConfig) -> bool {
        is_applicable(asset, options)
    }

    async fn transform(
        &self,
        asset: &Asset,
        options: &ResolvedConfig,
    ) -> Result<Vec<Asset>, CompressError> {
        self.compress(asset, options).await
    }
}
