use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use uuid::Uuid;

use crate::document::layer::LayerId;
use crate::foundation::error::FlipbookResult;
use crate::raster::bitmap::Bitmap;

/// Stable identity of a frame in the timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct FrameId(pub Uuid);

impl FrameId {
    /// Fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FrameId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Encoded image bytes plus a memoized decode.
pub struct EncodedImage {
    bytes: Arc<Vec<u8>>,
    decoded: OnceLock<Arc<Bitmap>>,
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("len", &self.bytes.len())
            .field("decoded", &self.decoded.get().is_some())
            .finish()
    }
}

/// One layer's content on one frame.
///
/// Cells coming from a saved project stay encoded until first use; decoding can fail, in which
/// case consumers skip the cell rather than aborting.
#[derive(Clone, Debug)]
pub enum LayerImage {
    /// In-memory pixels.
    Decoded(Arc<Bitmap>),
    /// Encoded (PNG) bytes, decoded lazily.
    Encoded(Arc<EncodedImage>),
}

impl LayerImage {
    /// Wrap decoded pixels.
    pub fn from_bitmap(bitmap: Bitmap) -> Self {
        Self::Decoded(Arc::new(bitmap))
    }

    /// Wrap encoded bytes without decoding them.
    pub fn from_encoded(bytes: Vec<u8>) -> Self {
        Self::Encoded(Arc::new(EncodedImage {
            bytes: Arc::new(bytes),
            decoded: OnceLock::new(),
        }))
    }

    /// Pixels of this cell, decoding on first access.
    pub fn bitmap(&self) -> FlipbookResult<Arc<Bitmap>> {
        match self {
            Self::Decoded(bmp) => Ok(Arc::clone(bmp)),
            Self::Encoded(enc) => {
                if let Some(bmp) = enc.decoded.get() {
                    return Ok(Arc::clone(bmp));
                }
                let bmp = Arc::new(Bitmap::decode(&enc.bytes)?);
                let _ = enc.decoded.set(Arc::clone(&bmp));
                Ok(bmp)
            }
        }
    }

    /// PNG bytes of this cell, reusing the original encoding when there is one.
    pub fn to_png(&self) -> FlipbookResult<Vec<u8>> {
        match self {
            Self::Decoded(bmp) => bmp.encode_png(),
            Self::Encoded(enc) => Ok(enc.bytes.as_ref().clone()),
        }
    }
}

/// One timeline frame: a bitmap per layer plus a lazily rebuilt composite thumbnail.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Identity.
    pub id: FrameId,
    pub(crate) cells: HashMap<LayerId, LayerImage>,
    pub(crate) thumbnail: Option<Arc<Bitmap>>,
}

impl Frame {
    /// An empty frame; the store backfills a blank cell for every layer.
    pub fn new() -> Self {
        Self::with_id(FrameId::new())
    }

    /// An empty frame with a known id.
    pub fn with_id(id: FrameId) -> Self {
        Self {
            id,
            cells: HashMap::new(),
            thumbnail: None,
        }
    }

    /// The cell for `layer`, if present.
    pub fn cell(&self, layer: LayerId) -> Option<&LayerImage> {
        self.cells.get(&layer)
    }

    /// Whether this frame has a cell for `layer`.
    pub fn has_layer(&self, layer: LayerId) -> bool {
        self.cells.contains_key(&layer)
    }

    /// Replace (or insert) a layer cell and drop the cached thumbnail.
    pub(crate) fn set_cell(&mut self, layer: LayerId, image: LayerImage) {
        self.cells.insert(layer, image);
        self.thumbnail = None;
    }

    /// Cached thumbnail, if still valid.
    pub fn cached_thumbnail(&self) -> Option<&Arc<Bitmap>> {
        self.thumbnail.as_ref()
    }

    pub(crate) fn invalidate_thumbnail(&mut self) {
        self.thumbnail = None;
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}
