//! Per-invocation description of the image being compressed.

use assetpack_core::Asset;
use thiserror::Error;

use crate::codec::SourceImage;
use crate::format::SourceFormat;

/// Reasons an asset cannot be described as a compressible image.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The asset's extension is not a recognized source format.
    #[error("Unsupported source extension: {0:?}")]
    UnsupportedExtension(Option<String>),

    /// The asset has no bytes to compress.
    #[error("Source buffer is empty")]
    EmptyBuffer,
}

/// What to compress: source format, scale factor, and the source image.
#[derive(Debug, Clone)]
pub struct ImageDescriptor {
    pub format: SourceFormat,
    /// Output scale relative to the source. Always 1 for now; reserved for
    /// downscaled variants.
    pub resolution: f32,
    /// The asset's buffer, shared read-only and decoded at most once.
    pub source: SourceImage,
}

impl ImageDescriptor {
    pub fn from_asset(asset: &Asset) -> Result<Self, DescriptorError> {
        let format = asset
            .extension()
            .and_then(SourceFormat::from_extension)
            .ok_or_else(|| {
                DescriptorError::UnsupportedExtension(asset.extension().map(str::to_string))
            })?;

        if asset.buffer().is_empty() {
            return Err(DescriptorError::EmptyBuffer);
        }

        Ok(Self {
            format,
            resolution: 1.0,
            source: SourceImage::new(asset.buffer().clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_from_png() {
        let asset = Asset::new("ui/icon.png", vec![1, 2, 3]);
        let descriptor = ImageDescriptor::from_asset(&asset).unwrap();
        assert_eq!(descriptor.format, SourceFormat::Png);
        assert_eq!(descriptor.resolution, 1.0);
        assert_eq!(descriptor.source.bytes().as_ref(), &[1, 2, 3]);
    }

    #[test]
    fn test_descriptor_shares_source_bytes() {
        let asset = Asset::new("photo.JPEG", vec![7u8; 64]);
        let descriptor = ImageDescriptor::from_asset(&asset).unwrap();
        assert_eq!(descriptor.format, SourceFormat::Jpeg);
        assert_eq!(descriptor.source.bytes().as_ptr(), asset.buffer().as_ptr());
    }

    #[test]
    fn test_descriptor_rejects_unknown_extension() {
        let asset = Asset::new("notes.txt", vec![1]);
        let err = ImageDescriptor::from_asset(&asset).unwrap_err();
        assert!(matches!(
            err,
            DescriptorError::UnsupportedExtension(Some(ref ext)) if ext == ".txt"
        ));

        let asset = Asset::new("Makefile", vec![1]);
        let err = ImageDescriptor::from_asset(&asset).unwrap_err();
        assert!(matches!(err, DescriptorError::UnsupportedExtension(None)));
    }

    #[test]
    fn test_descriptor_rejects_empty_buffer() {
        let asset = Asset::new("icon.png", Vec::new());
        let err = ImageDescriptor::from_asset(&asset).unwrap_err();
        assert!(matches!(err, DescriptorError::EmptyBuffer));
    }
}
