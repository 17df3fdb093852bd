//! Turns encoded variants into derivative assets.

use assetpack_core::{split_extension, Asset, Tag};

use crate::encoder::EncodedVariant;

/// Replace the last extension of `filename` with `extension` (no dot).
///
/// Earlier dots are kept: `"sprite.sheet.png"` becomes `"sprite.sheet.jpg"`.
/// A filename without an extension gets one appended.
pub fn derive_filename(filename: &str, extension: &str) -> String {
    let (stem, _) = split_extension(filename);
    format!("{stem}.{extension}")
}

/// Build one derivative per variant, in variant order.
///
/// Each derivative is a sibling of `asset` carrying a copy of its metadata
/// plus `skip_tag`, so a later pass over the output does not compress it
/// again. The variant's buffer moves into the derivative; `asset` is not
/// modified.
pub fn assemble(asset: &Asset, variants: Vec<EncodedVariant>, skip_tag: Tag) -> Vec<Asset> {
    variants
        .into_iter()
        .map(|variant| {
            let filename = derive_filename(asset.filename(), variant.format.extension());
            let mut derivative = asset.derive(&filename);
            derivative.metadata_mut().set(skip_tag);
            derivative.set_buffer(variant.buffer);
            derivative
        })
        .collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: everything before the last extension survives verbatim.
        #[test]
        fn prop_prefix_preserved(
            stem in "[a-z]{1,6}(\\.[a-z]{1,4}){0,3}",
            ext in "(png|jpg|jpeg)",
            target in "(png|jpg|webp|avif)",
        ) {
            let filename = format!("{stem}.{ext}");
            let derived = derive_filename(&filename, &target);
            prop_assert_eq!(derived, format!("{stem}.{target}"));
        }
    }
}
