//! Concurrent per-format encoding with an all-or-nothing join.
//!
//! One task is issued per enabled raster format, plus one for the GPU branch
//! when it is on. All tasks are polled together; the join completes when
//! every task has finished, or fails as soon as one fails.

use std::path::Path;
use std::sync::Arc;

use futures::future::try_join_all;
use thiserror::Error;
use tracing::debug;

use crate::codec::{CodecError, GpuArtifact, GpuTextureCodec, RasterCodec};
use crate::config::ResolvedFormats;
use crate::descriptor::ImageDescriptor;
use crate::format::RasterFormat;

/// Failure of one encode task, which fails the whole fan-out.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("{format} encode failed: {source}")]
    Raster {
        format: RasterFormat,
        #[source]
        source: CodecError,
    },

    #[error("GPU texture encode failed: {0}")]
    Gpu(#[source] CodecError),
}

/// Format of an encoded variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantFormat {
    Raster(RasterFormat),
    /// GPU texture; the codec chooses the extension.
    Gpu(String),
}

impl VariantFormat {
    /// Extension of the derivative, without the leading dot.
    pub fn extension(&self) -> &str {
        match self {
            VariantFormat::Raster(format) => format.extension(),
            VariantFormat::Gpu(extension) => extension,
        }
    }
}

/// One encoded output for a source image.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedVariant {
    pub format: VariantFormat,
    pub buffer: Vec<u8>,
}

/// Drives the raster and GPU codecs for one asset at a time.
#[derive(Clone)]
pub struct FanOutEncoder {
    raster: Arc<dyn RasterCodec>,
    gpu: Arc<dyn GpuTextureCodec>,
}

impl FanOutEncoder {
    pub fn new(raster: Arc<dyn RasterCodec>, gpu: Arc<dyn GpuTextureCodec>) -> Self {
        Self { raster, gpu }
    }

    /// Encode `descriptor` into every enabled format.
    ///
    /// Raster variants come first, in format declaration order, followed by
    /// any GPU variants. Either every task succeeds or an error is returned
    /// and no variant is kept.
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub async fn encode(
        &self,
        path: &Path,
        descriptor: &ImageDescriptor,
        formats: &ResolvedFormats,
    ) -> Result<Vec<EncodedVariant>, EncodeError> {
        let tasks = formats.raster_options().into_iter().map(|options| {
            let source = descriptor.source.clone();
            let codec = &self.raster;
            async move {
                let format = options.format();
                let buffer = codec
                    .encode_raster(source, options)
                    .await
                    .and_then(|buffer| non_empty(buffer, format.key()))
                    .map_err(|source| EncodeError::Raster { format, source })?;
                debug!(%format, bytes = buffer.len(), "encoded variant");
                Ok::<_, EncodeError>(EncodedVariant {
                    format: VariantFormat::Raster(format),
                    buffer,
                })
            }
        });

        let gpu = async {
            let Some(options) = formats.gpu.enabled() else {
                return Ok::<_, EncodeError>(Vec::new());
            };
            let artifacts = self
                .gpu
                .encode_gpu_texture(path, options)
                .await
                .map_err(EncodeError::Gpu)?;
            artifacts
                .into_iter()
                .map(|GpuArtifact { extension, buffer }| {
                    let buffer = non_empty(buffer, "gpu").map_err(EncodeError::Gpu)?;
                    Ok(EncodedVariant {
                        format: VariantFormat::Gpu(extension),
                        buffer,
                    })
                })
                .collect::<Result<Vec<_>, EncodeError>>()
        };

        let (mut variants, gpu_variants) = futures::try_join!(try_join_all(tasks), gpu)?;
        variants.extend(gpu_variants);

        Ok(variants)
    }
}

fn non_empty(buffer: Vec<u8>, format: &str) -> Result<Vec<u8>, CodecError> {
    if buffer.is_empty() {
        Err(CodecError::EmptyOutput(format.to_string()))
    } else {
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{EncodeOptions, InertGpuCodec, SourceImage};
    use crate::config::{resolve, CompressConfig, CompressDefaults};
    use assetpack_core::Asset;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Returns the format key as bytes; fails for formats in `fail`.
    #[derive(Default)]
    struct EchoCodec {
        fail: Vec<RasterFormat>,
        calls: Mutex<Vec<RasterFormat>>,
    }

    #[async_trait]
    impl RasterCodec for EchoCodec {
        async fn encode_raster(
            &self,
            _source: SourceImage,
            options: EncodeOptions,
        ) -> Result<Vec<u8>, CodecError> {
            let format = options.format();
            self.calls.lock().unwrap().push(format);
            tokio::task::yield_now().await;
            if self.fail.contains(&format) {
                return Err(CodecError::Encode {
                    format: format.to_string(),
                    message: "injected".to_string(),
                });
            }
            Ok(format.key().as_bytes().to_vec())
        }
    }

    /// Counts concurrently running tasks to observe the fan-out.
    #[derive(Default)]
    struct GateCodec {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl RasterCodec for GateCodec {
        async fn encode_raster(
            &self,
            _source: SourceImage,
            _options: EncodeOptions,
        ) -> Result<Vec<u8>, CodecError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            for _ in 0..4 {
                tokio::task::yield_now().await;
            }
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![1])
        }
    }

    struct TextureCodec {
        artifacts: Vec<GpuArtifact>,
    }

    #[async_trait]
    impl GpuTextureCodec for TextureCodec {
        async fn encode_gpu_texture(
            &self,
            _path: &Path,
            _options: &crate::config::GpuOptions,
        ) -> Result<Vec<GpuArtifact>, CodecError> {
            Ok(self.artifacts.clone())
        }
    }

    fn formats(json: &str) -> ResolvedFormats {
        let config = CompressConfig::from_json(json).unwrap();
        resolve(&config, &CompressDefaults::default())
            .formats()
            .cloned()
            .unwrap()
    }

    fn descriptor() -> ImageDescriptor {
        ImageDescriptor::from_asset(&Asset::new("icon.png", vec![1, 2, 3])).unwrap()
    }

    fn encoder(raster: Arc<dyn RasterCodec>) -> FanOutEncoder {
        FanOutEncoder::new(raster, Arc::new(InertGpuCodec))
    }

    #[tokio::test]
    async fn test_variants_follow_declaration_order() {
        let variants = encoder(Arc::new(EchoCodec::default()))
            .encode(Path::new("icon.png"), &descriptor(), &formats(r#"{ "avif": true }"#))
            .await
            .unwrap();

        let extensions: Vec<_> = variants.iter().map(|v| v.format.extension()).collect();
        assert_eq!(extensions, ["png", "jpg", "webp", "avif"]);
        assert_eq!(variants[2].buffer, b"webp");
    }

    #[tokio::test]
    async fn test_disabled_formats_issue_no_task() {
        let codec = Arc::new(EchoCodec::default());
        let formats = formats(r#"{ "png": false, "jpg": false }"#);
        let variants = encoder(codec.clone())
            .encode(Path::new("icon.png"), &descriptor(), &formats)
            .await
            .unwrap();

        assert_eq!(variants.len(), 1);
        assert_eq!(*codec.calls.lock().unwrap(), vec![RasterFormat::Webp]);
    }

    #[tokio::test]
    async fn test_tasks_run_concurrently() {
        let codec = Arc::new(GateCodec::default());
        encoder(codec.clone())
            .encode(Path::new("icon.png"), &descriptor(), &formats("{}"))
            .await
            .unwrap();

        assert_eq!(codec.peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_single_failure_fails_fan_out() {
        let codec = Arc::new(EchoCodec {
            fail: vec![RasterFormat::Jpg],
            ..Default::default()
        });
        let err = encoder(codec)
            .encode(Path::new("icon.png"), &descriptor(), &formats("{}"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EncodeError::Raster {
                format: RasterFormat::Jpg,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_codec_output_is_an_error() {
        struct Empty;

        #[async_trait]
        impl RasterCodec for Empty {
            async fn encode_raster(
                &self,
                _: SourceImage,
                _: EncodeOptions,
            ) -> Result<Vec<u8>, CodecError> {
                Ok(Vec::new())
            }
        }

        let err = encoder(Arc::new(Empty))
            .encode(Path::new("icon.png"), &descriptor(), &formats("{}"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EncodeError::Raster {
                source: CodecError::EmptyOutput(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_gpu_variants_are_appended() {
        let gpu = TextureCodec {
            artifacts: vec![GpuArtifact {
                extension: "bc7.dds".to_string(),
                buffer: vec![0xDD],
            }],
        };
        let encoder = FanOutEncoder::new(Arc::new(EchoCodec::default()), Arc::new(gpu));
        let formats = formats(r#"{ "jpg": false, "gpu": true }"#);
        let variants = encoder
            .encode(Path::new("icon.png"), &descriptor(), &formats)
            .await
            .unwrap();

        let extensions: Vec<_> = variants.iter().map(|v| v.format.extension()).collect();
        assert_eq!(extensions, ["png", "webp", "bc7.dds"]);
    }

    #[tokio::test]
    async fn test_gpu_branch_skipped_when_disabled() {
        let gpu = TextureCodec {
            artifacts: vec![GpuArtifact {
                extension: "bc7.dds".to_string(),
                buffer: vec![0xDD],
            }],
        };
        let encoder = FanOutEncoder::new(Arc::new(EchoCodec::default()), Arc::new(gpu));
        let variants = encoder
            .encode(Path::new("icon.png"), &descriptor(), &formats("{}"))
            .await
            .unwrap();
        assert_eq!(variants.len(), 3);
    }

    #[tokio::test]
    async fn test_inert_gpu_adds_nothing() {
        let variants = encoder(Arc::new(EchoCodec::default()))
            .encode(Path::new("icon.png"), &descriptor(), &formats(r#"{ "gpu": true }"#))
            .await
            .unwrap();
        assert_eq!(variants.len(), 3);
    }
}
