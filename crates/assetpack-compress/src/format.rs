//! Source and output image formats.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Extensions accepted as compression sources.
pub const SOURCE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg"];

/// Raster formats the stage can produce, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
    Png,
    Jpg,
    Webp,
    Avif,
}

impl RasterFormat {
    /// Every raster format; fan-out results follow this order.
    pub const ALL: [RasterFormat; 4] = [
        RasterFormat::Png,
        RasterFormat::Jpg,
        RasterFormat::Webp,
        RasterFormat::Avif,
    ];

    /// Configuration key.
    pub fn key(self) -> &'static str {
        match self {
            RasterFormat::Png => "png",
            RasterFormat::Jpg => "jpg",
            RasterFormat::Webp => "webp",
            RasterFormat::Avif => "avif",
        }
    }

    /// Extension of derivatives in this format, without the dot.
    pub fn extension(self) -> &'static str {
        self.key()
    }
}

impl fmt::Display for RasterFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Format of a source asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Png,
    Jpeg,
}

impl SourceFormat {
    /// Parse a dotted extension such as `".JPEG"`.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            ".png" => Some(SourceFormat::Png),
            ".jpg" | ".jpeg" => Some(SourceFormat::Jpeg),
            _ => None,
        }
    }
}
