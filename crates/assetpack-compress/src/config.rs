//! Compression configuration and its resolution against defaults.
//!
//! Users describe the stage with a [`CompressConfig`]: either a bare boolean
//! or a [`CompressOptions`] object where every format key is itself a
//! boolean or a partial options object. [`resolve`] turns that loose shape
//! into a [`ResolvedConfig`] in which every format has a concrete
//! [`Setting`]. Resolution happens once, when the stage is built.
//!
//! | user value | resolved |
//! |------------|----------|
//! | `false`    | disabled |
//! | `true`     | enabled with the default options |
//! | omitted    | the format's default entry (enabled or disabled) |
//! | `{ .. }`   | enabled, given fields over default fields |
//!
//! Unknown keys are ignored.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::EncodeOptions;
use crate::format::RasterFormat;

/// Default PNG quality.
pub const DEFAULT_PNG_QUALITY: u8 = 90;
/// Default WebP quality.
pub const DEFAULT_WEBP_QUALITY: u8 = 80;
/// Default WebP alpha-channel quality.
pub const DEFAULT_WEBP_ALPHA_QUALITY: u8 = 80;

/// Errors raised while loading a configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid JSON or does not fit the option shapes.
    #[error("Invalid compress configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Either an on/off switch or an options object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Toggle<T> {
    Flag(bool),
    Options(T),
}

impl<T: Default> Default for Toggle<T> {
    fn default() -> Self {
        Toggle::Options(T::default())
    }
}

/// PNG encoder options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PngOptions {
    /// Quality (0-100); used by palette-quantizing encoders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    /// zlib compression level (0-9).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_level: Option<u8>,
    /// Interlaced output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progressive: Option<bool>,
}

/// JPEG encoder options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JpgOptions {
    /// Quality (1-100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progressive: Option<bool>,
}

/// WebP encoder options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WebpOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha_quality: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lossless: Option<bool>,
    /// CPU effort (0-6).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effort: Option<u8>,
}

/// AVIF encoder options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AvifOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    /// Encoder speed (1-10, 10 is fastest).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lossless: Option<bool>,
}

/// GPU texture settings, keyed by block-compression codec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuOptions {
    #[serde(rename = "BC7", skip_serializing_if = "Option::is_none")]
    pub bc7: Option<Bc7Options>,
    #[serde(rename = "ASTC", skip_serializing_if = "Option::is_none")]
    pub astc: Option<AstcOptions>,
}

/// BC7 has no tunables at this boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bc7Options {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AstcOptions {
    /// Block footprint, e.g. `"4x4"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_size: Option<String>,
    /// Search effort, e.g. `"exhaustive"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
}

/// Field-wise overlay of partial options onto defaults.
pub trait Merge {
    /// Keep every field set in `self`; take the rest from `defaults`.
    fn merge(self, defaults: &Self) -> Self;
}

macro_rules! impl_merge {
    ($ty:ident { $($field:ident),* $(,)? }) => {
        impl Merge for $ty {
            fn merge(self, defaults: &Self) -> Self {
                Self {
                    $($field: self.$field.or_else(|| defaults.$field.clone()),)*
                }
            }
        }
    };
}

impl_merge!(PngOptions { quality, compression_level, progressive });
impl_merge!(JpgOptions { quality, progressive });
impl_merge!(WebpOptions { quality, alpha_quality, lossless, effort });
impl_merge!(AvifOptions { quality, speed, lossless });
impl_merge!(GpuOptions { bc7, astc });

/// Per-format user options. Missing keys fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub png: Option<Toggle<PngOptions>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jpg: Option<Toggle<JpgOptions>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webp: Option<Toggle<WebpOptions>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avif: Option<Toggle<AvifOptions>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu: Option<Toggle<GpuOptions>>,
}

/// Top-level user configuration; `false` disables the stage.
pub type CompressConfig = Toggle<CompressOptions>;

impl CompressConfig {
    /// Parse a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Configuration with only the given raster formats enabled.
    pub fn only(formats: &[RasterFormat]) -> Self {
        Toggle::Options(CompressOptions {
            png: flag_for(formats, RasterFormat::Png),
            jpg: flag_for(formats, RasterFormat::Jpg),
            webp: flag_for(formats, RasterFormat::Webp),
            avif: flag_for(formats, RasterFormat::Avif),
            gpu: Some(Toggle::Flag(false)),
        })
    }
}

fn flag_for<T>(formats: &[RasterFormat], format: RasterFormat) -> Option<Toggle<T>> {
    Some(Toggle::Flag(formats.contains(&format)))
}

/// Default entry for one format.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatDefault<T> {
    /// Whether the format is on when the user omits its key.
    pub enabled: bool,
    /// Options used when the format is on.
    pub options: T,
}

impl<T> FormatDefault<T> {
    fn new(enabled: bool, options: T) -> Self {
        Self { enabled, options }
    }
}

/// Defaults every user configuration is resolved against.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressDefaults {
    pub png: FormatDefault<PngOptions>,
    pub jpg: FormatDefault<JpgOptions>,
    pub webp: FormatDefault<WebpOptions>,
    pub avif: FormatDefault<AvifOptions>,
    pub gpu: FormatDefault<GpuOptions>,
}

impl Default for CompressDefaults {
    fn default() -> Self {
        Self {
            png: FormatDefault::new(
                true,
                PngOptions {
                    quality: Some(DEFAULT_PNG_QUALITY),
                    ..Default::default()
                },
            ),
            jpg: FormatDefault::new(true, JpgOptions::default()),
            webp: FormatDefault::new(
                true,
                WebpOptions {
                    quality: Some(DEFAULT_WEBP_QUALITY),
                    alpha_quality: Some(DEFAULT_WEBP_ALPHA_QUALITY),
                    ..Default::default()
                },
            ),
            avif: FormatDefault::new(false, AvifOptions::default()),
            gpu: FormatDefault::new(
                false,
                GpuOptions {
                    bc7: Some(Bc7Options {}),
                    astc: None,
                },
            ),
        }
    }
}

/// Resolved state of one format.
#[derive(Debug, Clone, PartialEq)]
pub enum Setting<T> {
    Disabled,
    Enabled(T),
}

impl<T> Setting<T> {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Setting::Enabled(_))
    }

    /// Options when enabled.
    pub fn enabled(&self) -> Option<&T> {
        match self {
            Setting::Enabled(options) => Some(options),
            Setting::Disabled => None,
        }
    }
}

impl<T: Clone> Setting<T> {
    fn to_toggle(&self) -> Option<Toggle<T>> {
        Some(match self {
            Setting::Disabled => Toggle::Flag(false),
            Setting::Enabled(options) => Toggle::Options(options.clone()),
        })
    }
}

/// Every format with a concrete setting.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFormats {
    pub png: Setting<PngOptions>,
    pub jpg: Setting<JpgOptions>,
    pub webp: Setting<WebpOptions>,
    pub avif: Setting<AvifOptions>,
    pub gpu: Setting<GpuOptions>,
}

impl ResolvedFormats {
    /// Encoder options for each enabled raster format, in declaration order.
    pub fn raster_options(&self) -> Vec<EncodeOptions> {
        let png = self.png.enabled().cloned().map(EncodeOptions::Png);
        let jpg = self.jpg.enabled().cloned().map(EncodeOptions::Jpg);
        let webp = self.webp.enabled().cloned().map(EncodeOptions::Webp);
        let avif = self.avif.enabled().cloned().map(EncodeOptions::Avif);
        [png, jpg, webp, avif].into_iter().flatten().collect()
    }

    /// Enabled raster formats, in declaration order.
    pub fn enabled_formats(&self) -> Vec<RasterFormat> {
        self.raster_options().iter().map(EncodeOptions::format).collect()
    }

    /// True when at least one format, raster or GPU, is on.
    pub fn any_enabled(&self) -> bool {
        self.png.is_enabled()
            || self.jpg.is_enabled()
            || self.webp.is_enabled()
            || self.avif.is_enabled()
            || self.gpu.is_enabled()
    }
}

/// Fully resolved configuration held by the stage.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedConfig {
    /// The whole stage is off.
    Disabled,
    Enabled(ResolvedFormats),
}

impl ResolvedConfig {
    /// Formats when the stage is on.
    pub fn formats(&self) -> Option<&ResolvedFormats> {
        match self {
            ResolvedConfig::Enabled(formats) => Some(formats),
            ResolvedConfig::Disabled => None,
        }
    }

    /// True when the stage is on and would produce at least one variant.
    pub fn is_enabled(&self) -> bool {
        self.formats().is_some_and(ResolvedFormats::any_enabled)
    }

    /// Express the resolved state as user configuration.
    ///
    /// Resolving the result against the same defaults gives back `self`.
    pub fn to_options(&self) -> CompressConfig {
        match self {
            ResolvedConfig::Disabled => Toggle::Flag(false),
            ResolvedConfig::Enabled(formats) => Toggle::Options(CompressOptions {
                png: formats.png.to_toggle(),
                jpg: formats.jpg.to_toggle(),
                webp: formats.webp.to_toggle(),
                avif: formats.avif.to_toggle(),
                gpu: formats.gpu.to_toggle(),
            }),
        }
    }
}

fn resolve_format<T: Clone + Merge>(
    user: Option<&Toggle<T>>,
    default: &FormatDefault<T>,
) -> Setting<T> {
    match user {
        None if default.enabled => Setting::Enabled(default.options.clone()),
        None => Setting::Disabled,
        Some(Toggle::Flag(false)) => Setting::Disabled,
        Some(Toggle::Flag(true)) => Setting::Enabled(default.options.clone()),
        Some(Toggle::Options(options)) => Setting::Enabled(options.clone().merge(&default.options)),
    }
}

/// Resolve user configuration against `defaults`.
pub fn resolve(config: &CompressConfig, defaults: &CompressDefaults) -> ResolvedConfig {
    let options = match config {
        Toggle::Flag(false) => return ResolvedConfig::Disabled,
        Toggle::Flag(true) => CompressOptions::default(),
        Toggle::Options(options) => options.clone(),
    };

    ResolvedConfig::Enabled(ResolvedFormats {
        png: resolve_format(options.png.as_ref(), &defaults.png),
        jpg: resolve_format(options.jpg.as_ref(), &defaults.jpg),
        webp: resolve_format(options.webp.as_ref(), &defaults.webp),
        avif: resolve_format(options.avif.as_ref(), &defaults.avif),
        gpu: resolve_format(options.gpu.as_ref(), &defaults.gpu),
    })
}


// ============================================================================
// Property-Based Tests
// ============================================================================
