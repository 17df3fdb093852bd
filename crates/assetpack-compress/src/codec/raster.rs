//! Raster encoding using the `image` and `webp` crates.
//!
//! The source is decoded once per asset through [`SourceImage`] and then
//! re-encoded into one format per call. Encoding is CPU bound, so inside a
//! tokio runtime [`ImageCodec`] runs it on the blocking pool and several
//! formats for the same asset proceed in parallel. Without a runtime it
//! encodes on the calling thread.
//!
//! Option coverage:
//! - PNG: `compressionLevel` picks fast/default/best deflate. `progressive`
//!   (interlacing) is rejected as unsupported; `quality` only applies to
//!   palette-quantizing encoders and is not used
//! - JPEG: `quality` (default 80); baseline only
//! - WebP: `quality`, `alphaQuality`, `lossless` and `effort` through libwebp
//! - AVIF: `quality`, `speed` and `lossless`, behind the `avif` feature

use std::io::Cursor;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use tokio::runtime::Handle;
use tracing::trace;

use super::{CodecError, EncodeOptions, RasterCodec, SourceImage};
use crate::config::{
    AvifOptions, JpgOptions, PngOptions, WebpOptions, DEFAULT_WEBP_ALPHA_QUALITY,
    DEFAULT_WEBP_QUALITY,
};
use crate::format::RasterFormat;

/// JPEG quality when none is configured.
pub const DEFAULT_JPEG_QUALITY: u8 = 80;
/// AVIF quality when none is configured.
pub const DEFAULT_AVIF_QUALITY: u8 = 50;
/// AVIF speed when none is configured.
pub const DEFAULT_AVIF_SPEED: u8 = 4;
/// libwebp `method` when no effort is configured.
pub const DEFAULT_WEBP_EFFORT: u8 = 4;

/// [`RasterCodec`] backed by the `image` and `webp` crates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCodec;

#[async_trait]
impl RasterCodec for ImageCodec {
    async fn encode_raster(
        &self,
        source: SourceImage,
        options: EncodeOptions,
    ) -> Result<Vec<u8>, CodecError> {
        match Handle::try_current() {
            Ok(handle) => handle
                .spawn_blocking(move || encode_blocking(&source, &options))
                .await
                .map_err(|e| CodecError::Aborted(e.to_string()))?,
            Err(_) => {
                trace!(format = %options.format(), "no tokio runtime, encoding inline");
                encode_blocking(&source, &options)
            }
        }
    }
}

/// Decode `source` (once, shared with its clones) and encode it with
/// `options`, on the current thread.
pub fn encode_blocking(
    source: &SourceImage,
    options: &EncodeOptions,
) -> Result<Vec<u8>, CodecError> {
    let image = source.decoded()?;
    encode_image(&image, options)
}

/// Encode already decoded pixels into the format selected by `options`.
pub fn encode_image(image: &DynamicImage, options: &EncodeOptions) -> Result<Vec<u8>, CodecError> {
    match options {
        EncodeOptions::Png(png) => encode_png(image, png),
        EncodeOptions::Jpg(jpg) => encode_jpeg(image, jpg),
        EncodeOptions::Webp(webp) => encode_webp(image, webp),
        EncodeOptions::Avif(avif) => encode_avif(image, avif),
    }
}

fn encode_error(format: RasterFormat, err: impl ToString) -> CodecError {
    CodecError::Encode {
        format: format.to_string(),
        message: err.to_string(),
    }
}

/// Pixel data in the narrowest 8-bit layout that keeps alpha.
fn rgb_or_rgba(image: &DynamicImage) -> (Vec<u8>, ExtendedColorType) {
    if image.color().has_alpha() {
        (image.to_rgba8().into_raw(), ExtendedColorType::Rgba8)
    } else {
        (image.to_rgb8().into_raw(), ExtendedColorType::Rgb8)
    }
}

fn png_compression(level: Option<u8>) -> CompressionType {
    match level {
        None => CompressionType::Default,
        Some(0..=3) => CompressionType::Fast,
        Some(4..=6) => CompressionType::Default,
        Some(_) => CompressionType::Best,
    }
}

fn encode_png(image: &DynamicImage, options: &PngOptions) -> Result<Vec<u8>, CodecError> {
    // the png encoder only writes non-interlaced images
    if options.progressive == Some(true) {
        return Err(CodecError::Unsupported("progressive png".to_string()));
    }

    let (pixels, color) = rgb_or_rgba(image);
    let mut buffer = Cursor::new(Vec::new());

    let encoder = PngEncoder::new_with_quality(
        &mut buffer,
        png_compression(options.compression_level),
        FilterType::Adaptive,
    );
    encoder
        .write_image(&pixels, image.width(), image.height(), color)
        .map_err(|e| encode_error(RasterFormat::Png, e))?;

    Ok(buffer.into_inner())
}

fn encode_jpeg(image: &DynamicImage, options: &JpgOptions) -> Result<Vec<u8>, CodecError> {
    // JPEG has no alpha channel
    let pixels = image.to_rgb8();
    let quality = options.quality.unwrap_or(DEFAULT_JPEG_QUALITY).clamp(1, 100);
    let mut buffer = Cursor::new(Vec::new());

    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder
        .write_image(
            pixels.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| encode_error(RasterFormat::Jpg, e))?;

    Ok(buffer.into_inner())
}

/// libwebp settings for `options`; lossy unless `lossless` is set.
fn webp_config(options: &WebpOptions) -> Result<webp::WebPConfig, CodecError> {
    let mut config = webp::WebPConfig::new()
        .map_err(|()| encode_error(RasterFormat::Webp, "invalid libwebp version"))?;

    let lossless = options.lossless == Some(true);
    config.lossless = i32::from(lossless);
    config.alpha_compression = i32::from(!lossless);
    config.quality = f32::from(options.quality.unwrap_or(DEFAULT_WEBP_QUALITY).min(100));
    config.alpha_quality = i32::from(
        options
            .alpha_quality
            .unwrap_or(DEFAULT_WEBP_ALPHA_QUALITY)
            .min(100),
    );
    config.method = i32::from(options.effort.unwrap_or(DEFAULT_WEBP_EFFORT).min(6));

    Ok(config)
}

fn encode_webp(image: &DynamicImage, options: &WebpOptions) -> Result<Vec<u8>, CodecError> {
    let config = webp_config(options)?;
    let (pixels, color) = rgb_or_rgba(image);

    let (width, height) = (image.width(), image.height());
    let encoder = match color {
        ExtendedColorType::Rgba8 => webp::Encoder::from_rgba(&pixels, width, height),
        _ => webp::Encoder::from_rgb(&pixels, width, height),
    };
    let encoded = encoder
        .encode_advanced(&config)
        .map_err(|e| encode_error(RasterFormat::Webp, format!("{e:?}")))?;

    Ok(encoded.to_vec())
}

/// AVIF quality for `options`; lossless forces the maximum.
#[cfg_attr(not(feature = "avif"), allow(dead_code))]
fn avif_quality(options: &AvifOptions) -> u8 {
    if options.lossless == Some(true) {
        100
    } else {
        options.quality.unwrap_or(DEFAULT_AVIF_QUALITY).clamp(1, 100)
    }
}

#[cfg(feature = "avif")]
fn encode_avif(image: &DynamicImage, options: &AvifOptions) -> Result<Vec<u8>, CodecError> {
    use image::codecs::avif::AvifEncoder;

    let (pixels, color) = rgb_or_rgba(image);
    let speed = options.speed.unwrap_or(DEFAULT_AVIF_SPEED).clamp(1, 10);
    let mut buffer = Cursor::new(Vec::new());

    let encoder = AvifEncoder::new_with_speed_quality(&mut buffer, speed, avif_quality(options));
    encoder
        .write_image(&pixels, image.width(), image.height(), color)
        .map_err(|e| encode_error(RasterFormat::Avif, e))?;

    Ok(buffer.into_inner())
}

#[cfg(not(feature = "avif"))]
fn encode_avif(_image: &DynamicImage, _options: &AvifOptions) -> Result<Vec<u8>, CodecError> {
    Err(CodecError::Unsupported(RasterFormat::Avif.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use std::sync::Arc;

    fn gradient_rgba(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 255 / width) as u8, (y * 255 / height) as u8, 128, 200])
        }))
    }

    fn gradient_rgb(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, (x * y % 256) as u8])
        }))
    }

    fn encode_source(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, format).unwrap();
        buffer.into_inner()
    }

    fn png_source() -> SourceImage {
        SourceImage::from(encode_source(&gradient_rgba(32, 24), ImageFormat::Png))
    }

    fn encode(options: EncodeOptions) -> Result<Vec<u8>, CodecError> {
        encode_blocking(&png_source(), &options)
    }

    fn webp(options: WebpOptions) -> Vec<u8> {
        encode_image(&gradient_rgb(64, 64), &EncodeOptions::Webp(options)).unwrap()
    }

    #[test]
    fn test_png_to_png() {
        let out = encode(EncodeOptions::Png(PngOptions::default())).unwrap();
        assert_eq!(&out[0..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 24));
        assert!(decoded.color().has_alpha());
    }

    #[test]
    fn test_png_to_jpeg_drops_alpha() {
        let out = encode(EncodeOptions::Jpg(JpgOptions::default())).unwrap();

        // SOI and EOI markers
        assert_eq!(&out[0..2], &[0xFF, 0xD8]);
        assert_eq!(&out[out.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_png_to_webp() {
        let out = encode(EncodeOptions::Webp(WebpOptions::default())).unwrap();
        assert_eq!(&out[0..4], b"RIFF");
        assert_eq!(&out[8..12], b"WEBP");
    }

    #[test]
    fn test_webp_quality_changes_output() {
        let low = webp(WebpOptions {
            quality: Some(5),
            lossless: Some(false),
            ..Default::default()
        });
        let high = webp(WebpOptions {
            quality: Some(100),
            ..Default::default()
        });

        assert_ne!(low, high);
        assert!(low.len() < high.len(), "{} >= {}", low.len(), high.len());
    }

    #[test]
    fn test_webp_lossy_by_default_lossless_on_request() {
        // VP8 is the lossy bitstream, VP8L the lossless one
        let lossy = webp(WebpOptions::default());
        assert_eq!(&lossy[12..16], b"VP8 ");

        let lossless = webp(WebpOptions {
            lossless: Some(true),
            ..Default::default()
        });
        assert_eq!(&lossless[12..16], b"VP8L");
    }

    #[test]
    fn test_webp_config_maps_options() {
        let config = webp_config(&WebpOptions {
            quality: Some(42),
            alpha_quality: Some(120),
            lossless: None,
            effort: Some(9),
        })
        .unwrap();
        assert_eq!(config.quality, 42.0);
        assert_eq!(config.alpha_quality, 100);
        assert_eq!(config.method, 6);
        assert_eq!(config.lossless, 0);

        let config = webp_config(&WebpOptions::default()).unwrap();
        assert_eq!(config.quality, f32::from(DEFAULT_WEBP_QUALITY));
        assert_eq!(config.alpha_quality, i32::from(DEFAULT_WEBP_ALPHA_QUALITY));
    }

    #[test]
    fn test_jpeg_source_to_png() {
        let source = SourceImage::from(encode_source(&gradient_rgb(16, 16), ImageFormat::Jpeg));
        let out = encode_blocking(&source, &EncodeOptions::Png(PngOptions::default())).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 16));
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn test_jpeg_quality_out_of_range_is_clamped() {
        let options = JpgOptions {
            quality: Some(0),
            ..Default::default()
        };
        assert!(encode(EncodeOptions::Jpg(options)).is_ok());
    }

    #[test]
    fn test_png_compression_levels() {
        assert!(matches!(png_compression(None), CompressionType::Default));
        assert!(matches!(png_compression(Some(1)), CompressionType::Fast));
        assert!(matches!(png_compression(Some(6)), CompressionType::Default));
        assert!(matches!(png_compression(Some(9)), CompressionType::Best));

        for level in [0u8, 6, 9] {
            let options = PngOptions {
                compression_level: Some(level),
                ..Default::default()
            };
            assert!(encode(EncodeOptions::Png(options)).is_ok());
        }
    }

    #[test]
    fn test_progressive_png_is_rejected() {
        let options = PngOptions {
            progressive: Some(true),
            ..Default::default()
        };
        let result = encode(EncodeOptions::Png(options));
        assert!(matches!(result, Err(CodecError::Unsupported(ref f)) if f == "progressive png"));

        let options = PngOptions {
            progressive: Some(false),
            ..Default::default()
        };
        assert!(encode(EncodeOptions::Png(options)).is_ok());
    }

    #[test]
    fn test_garbage_source_fails_to_decode() {
        let source = SourceImage::from(b"not an image".to_vec());
        let result = encode_blocking(&source, &EncodeOptions::Png(PngOptions::default()));
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[test]
    fn test_formats_share_one_decode() {
        let source = png_source();
        let png = encode_blocking(&source, &EncodeOptions::Png(PngOptions::default())).unwrap();
        let pixels = source.decoded().unwrap();

        let jpg = encode_blocking(&source, &EncodeOptions::Jpg(JpgOptions::default())).unwrap();
        assert!(Arc::ptr_eq(&pixels, &source.decoded().unwrap()));
        assert_ne!(png, jpg);
    }

    #[test]
    fn test_avif_lossless_forces_max_quality() {
        let lossless = AvifOptions {
            quality: Some(20),
            lossless: Some(true),
            ..Default::default()
        };
        assert_eq!(avif_quality(&lossless), 100);
        assert_eq!(avif_quality(&AvifOptions::default()), DEFAULT_AVIF_QUALITY);

        let out_of_range = AvifOptions {
            quality: Some(0),
            ..Default::default()
        };
        assert_eq!(avif_quality(&out_of_range), 1);
    }

    #[cfg(feature = "avif")]
    #[test]
    fn test_png_to_avif() {
        let options = AvifOptions {
            speed: Some(10),
            ..Default::default()
        };
        let out = encode(EncodeOptions::Avif(options)).unwrap();

        // ISO-BMFF file type box with the avif brand
        assert_eq!(&out[4..8], b"ftyp");
        assert_eq!(&out[8..12], b"avif");
    }

    #[cfg(feature = "avif")]
    #[test]
    fn test_avif_quality_changes_output() {
        let encode_at = |quality: u8, lossless: bool| {
            let options = AvifOptions {
                quality: Some(quality),
                speed: Some(10),
                lossless: Some(lossless),
            };
            encode_image(&gradient_rgb(32, 32), &EncodeOptions::Avif(options)).unwrap()
        };

        let low = encode_at(10, false);
        let high = encode_at(95, false);
        assert!(low.len() < high.len(), "{} >= {}", low.len(), high.len());

        // lossless ignores the configured quality
        let lossless = encode_at(10, true);
        assert!(low.len() < lossless.len(), "{} >= {}", low.len(), lossless.len());
    }

    #[cfg(not(feature = "avif"))]
    #[test]
    fn test_avif_unsupported_without_feature() {
        let result = encode(EncodeOptions::Avif(AvifOptions::default()));
        assert!(matches!(result, Err(CodecError::Unsupported(ref f)) if f == "avif"));
    }

    #[tokio::test]
    async fn test_image_codec_runs_async() {
        let out = ImageCodec
            .encode_raster(png_source(), EncodeOptions::Jpg(JpgOptions::default()))
            .await
            .unwrap();
        assert_eq!(&out[0..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_image_codec_runs_without_tokio_runtime() {
        let source = SourceImage::new(Bytes::from(encode_source(
            &gradient_rgba(8, 8),
            ImageFormat::Png,
        )));
        let codec = ImageCodec;
        let future = codec.encode_raster(source, EncodeOptions::Png(PngOptions::default()));

        let out = futures::executor::block_on(future).unwrap();
        assert_eq!(&out[1..4], b"PNG");
    }
}
