//! Applicability check for the compression stage.

use assetpack_core::{Asset, Tag};

use crate::config::ResolvedConfig;
use crate::format::SOURCE_EXTENSIONS;

/// Tag that keeps an asset out of compression (`nc`, "no-compress").
///
/// Other stages set it to exempt an asset; the compression stage sets it on
/// every derivative it produces.
pub const NO_COMPRESS: Tag = Tag::new("nc");

/// Whether `asset` should be compressed under `options`.
///
/// True when the stage is on with at least one format, the asset is a PNG
/// or JPEG, and [`NO_COMPRESS`] is not raised in its aggregated metadata.
pub fn is_applicable(asset: &Asset, options: &ResolvedConfig) -> bool {
    options.is_enabled() && asset.has_extension(SOURCE_EXTENSIONS) && !asset.has_tag(NO_COMPRESS)
}
