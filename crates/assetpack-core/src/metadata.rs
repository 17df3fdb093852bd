//! Typed metadata flags carried by assets.
//!
//! Stages signal each other through boolean flags keyed by a [`Tag`]. Each
//! stage documents the tags it honors; the compression stage, for example,
//! skips any asset flagged with its `nc` tag.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A stable metadata key declared by a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(&'static str);

impl Tag {
    /// Create a tag from its key.
    pub const fn new(key: &'static str) -> Self {
        Self(key)
    }

    /// The string key stored in [`Metadata`].
    pub const fn key(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Map of flag keys to boolean values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, bool>);

impl Metadata {
    /// Create an empty metadata map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag for `tag`.
    pub fn set(&mut self, tag: Tag) {
        self.0.insert(tag.key().to_string(), true);
    }

    /// Insert a raw key/value pair.
    pub fn insert(&mut self, key: impl Into<String>, value: bool) {
        self.0.insert(key.into(), value);
    }

    /// Look up a raw key.
    pub fn get(&self, key: &str) -> Option<bool> {
        self.0.get(key).copied()
    }

    /// True when `tag` is present and set to `true`.
    pub fn is_set(&self, tag: Tag) -> bool {
        self.get(tag.key()).unwrap_or(false)
    }

    /// Overlay `other` on top of `self`; keys in `other` win.
    pub fn extend_from(&mut self, other: &Metadata) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), *value);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(key, value)| (key.as_str(), *value))
    }
}

impl<K: Into<String>> FromIterator<(K, bool)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
