//! Source bytes shared by every encode task of one asset.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use image::DynamicImage;

use super::CodecError;

/// Read-only source buffer with a decode slot shared across format tasks.
///
/// Clones are cheap and point at the same slot, so the first task to call
/// [`SourceImage::decoded`] decodes and the others reuse its pixels.
#[derive(Debug, Clone)]
pub struct SourceImage {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    bytes: Bytes,
    decoded: Mutex<Option<Arc<DynamicImage>>>,
}

impl SourceImage {
    pub fn new(bytes: Bytes) -> Self {
        Self {
            inner: Arc::new(Inner {
                bytes,
                decoded: Mutex::new(None),
            }),
        }
    }

    /// The encoded source buffer.
    pub fn bytes(&self) -> &Bytes {
        &self.inner.bytes
    }

    /// Decoded pixels, decoding on first use.
    ///
    /// Blocks while another task is decoding. A failed decode is not cached.
    pub fn decoded(&self) -> Result<Arc<DynamicImage>, CodecError> {
        let mut slot = self
            .inner
            .decoded
            .lock()
            .map_err(|e| CodecError::Aborted(e.to_string()))?;

        if let Some(image) = slot.as_ref() {
            return Ok(Arc::clone(image));
        }

        let image = image::load_from_memory(&self.inner.bytes)
            .map(Arc::new)
            .map_err(|e| CodecError::Decode(e.to_string()))?;
        *slot = Some(Arc::clone(&image));

        Ok(image)
    }

    pub fn is_decoded(&self) -> bool {
        self.inner
            .decoded
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }
}

impl From<Bytes> for SourceImage {
    fn from(bytes: Bytes) -> Self {
        Self::new(bytes)
    }
}

impl From<Vec<u8>> for SourceImage {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(Bytes::from(bytes))
    }
}
