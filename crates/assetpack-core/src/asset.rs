//! The unit of content flowing through the pipeline.

use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::metadata::{Metadata, Tag};

/// A named buffer plus the metadata stages use to coordinate.
///
/// `metadata` holds the flags set on this asset directly. `inherited` holds
/// the flags aggregated from everything upstream of it (parent folders,
/// earlier stages, the asset it was derived from). [`Asset::all_metadata`]
/// is the merged view of both.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    path: PathBuf,
    buffer: Bytes,
    metadata: Metadata,
    inherited: Metadata,
    source: Option<PathBuf>,
}

impl Asset {
    pub fn new(path: impl Into<PathBuf>, buffer: impl Into<Bytes>) -> Self {
        Self {
            path: path.into(),
            buffer: buffer.into(),
            metadata: Metadata::new(),
            inherited: Metadata::new(),
            source: None,
        }
    }

    /// Replace the local metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Replace the metadata aggregated from upstream.
    pub fn with_inherited_metadata(mut self, inherited: Metadata) -> Self {
        self.inherited = inherited;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final path component, or an empty string for a root-like path.
    pub fn filename(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("")
    }

    /// Extension including its leading dot, e.g. `".png"`.
    pub fn extension(&self) -> Option<&str> {
        split_extension(self.filename()).1
    }

    /// Check the extension against a list of dotted, lowercase extensions.
    pub fn has_extension(&self, extensions: &[&str]) -> bool {
        self.extension().is_some_and(|ext| {
            extensions
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(ext))
        })
    }

    pub fn buffer(&self) -> &Bytes {
        &self.buffer
    }

    pub fn set_buffer(&mut self, buffer: impl Into<Bytes>) {
        self.buffer = buffer.into();
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Upstream flags overlaid with this asset's own flags.
    pub fn all_metadata(&self) -> Metadata {
        let mut all = self.inherited.clone();
        all.extend_from(&self.metadata);
        all
    }

    /// True when `tag` is raised anywhere in the aggregated view.
    pub fn has_tag(&self, tag: Tag) -> bool {
        self.metadata.get(tag.key()).unwrap_or_else(|| self.inherited.is_set(tag))
    }

    /// Path of the asset this one was derived from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Create a sibling asset named `filename`.
    ///
    /// The new asset starts with an empty buffer, a copy of this asset's
    /// metadata, and records this asset as its source.
    pub fn derive(&self, filename: &str) -> Asset {
        let path = match self.path.parent() {
            Some(parent) => parent.join(filename),
            None => PathBuf::from(filename),
        };

        Asset {
            path,
            buffer: Bytes::new(),
            metadata: self.metadata.clone(),
            inherited: self.inherited.clone(),
            source: Some(self.path.clone()),
        }
    }
}

/// Split a filename into the part before its last extension and the dotted
/// extension itself.
///
/// Only the last dot-delimited suffix counts, and it must be non-empty:
/// `"sprite.sheet.png"` splits into `("sprite.sheet", Some(".png"))`, while
/// `"README"` and `"trailing."` have no extension.
pub fn split_extension(filename: &str) -> (&str, Option<&str>) {
    match filename.rfind('.') {
        Some(idx) if idx + 1 < filename.len() => (&filename[..idx], Some(&filename[idx..])),
        _ => (filename, None),
    }
}
