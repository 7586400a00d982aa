//! Raster layer store: the per-frame, per-layer bitmap ground truth.
//!
//! Bitmap mutation is whole-buffer replacement only. Every frame holds a cell for every layer;
//! creating a layer backfills a blank cell onto all frames.

use std::sync::Arc;

use crate::composite::compositor::{self, Background};
use crate::document::frame::{Frame, FrameId, LayerImage};
use crate::document::history::Snapshot;
use crate::document::layer::{BlendMode, Layer, LayerId};
use crate::foundation::core::{CanvasSize, Rgba8};
use crate::foundation::error::{FlipbookError, FlipbookResult};
use crate::raster::bitmap::Bitmap;

/// Ordered layers (bottom first), ordered frames, canvas size and background.
#[derive(Debug)]
pub struct LayerStore {
    canvas: CanvasSize,
    layers: Vec<Layer>,
    frames: Vec<Frame>,
    background_image: Option<Arc<Bitmap>>,
    lease: Option<(FrameId, LayerId)>,
}

impl LayerStore {
    /// A document with one blank layer and one frame.
    pub fn new(canvas: CanvasSize) -> Self {
        let layer = Layer::new("Layer 1");
        let mut frame = Frame::new();
        frame.set_cell(layer.id, LayerImage::from_bitmap(Bitmap::blank(canvas)));
        Self {
            canvas,
            layers: vec![layer],
            frames: vec![frame],
            background_image: None,
            lease: None,
        }
    }

    /// Assemble a store from loaded parts, backfilling missing cells with blank bitmaps.
    pub fn from_parts(
        canvas: CanvasSize,
        layers: Vec<Layer>,
        mut frames: Vec<Frame>,
        background_image: Option<Arc<Bitmap>>,
    ) -> FlipbookResult<Self> {
        if layers.is_empty() {
            return Err(FlipbookError::validation("document needs at least one layer"));
        }
        if frames.is_empty() {
            return Err(FlipbookError::validation("document needs at least one frame"));
        }
        for frame in &mut frames {
            frame.cells.retain(|id, _| layers.iter().any(|l| l.id == *id));
            for layer in &layers {
                if !frame.has_layer(layer.id) {
                    tracing::debug!(frame = %frame.id, layer = %layer.id, "backfilling missing layer bitmap");
                    frame.set_cell(layer.id, LayerImage::from_bitmap(Bitmap::blank(canvas)));
                }
            }
        }
        Ok(Self {
            canvas,
            layers,
            frames,
            background_image,
            lease: None,
        })
    }

    /// Current canvas size.
    pub fn canvas_size(&self) -> CanvasSize {
        self.canvas
    }

    /// Layers, bottom first.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Layer by id.
    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Stack position of a layer (0 is the bottom).
    pub fn layer_index(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    /// Whether `id` exists and is visible and unlocked.
    pub fn is_editable(&self, id: LayerId) -> bool {
        self.layer(id).is_some_and(Layer::is_editable)
    }

    /// Frames in timeline order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Frame by id.
    pub fn frame(&self, id: FrameId) -> Option<&Frame> {
        self.frames.iter().find(|f| f.id == id)
    }

    /// Timeline position of a frame.
    pub fn frame_index(&self, id: FrameId) -> Option<usize> {
        self.frames.iter().position(|f| f.id == id)
    }

    /// Background image, if one is set.
    pub fn background_image(&self) -> Option<&Arc<Bitmap>> {
        self.background_image.as_ref()
    }

    /// Background used for thumbnails: the image if set, otherwise opaque white.
    pub fn background(&self) -> Background {
        match &self.background_image {
            Some(img) => Background::Image(Arc::clone(img)),
            None => Background::Solid(Rgba8::WHITE),
        }
    }

    fn frame_mut(&mut self, id: FrameId) -> FlipbookResult<&mut Frame> {
        self.frames
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| FlipbookError::validation(format!("unknown frame {id}")))
    }

    fn invalidate_all(&mut self) {
        for frame in &mut self.frames {
            frame.invalidate_thumbnail();
        }
    }

    /// Bitmap of one layer on one frame.
    pub fn get_bitmap(&self, frame: FrameId, layer: LayerId) -> FlipbookResult<Arc<Bitmap>> {
        let f = self
            .frame(frame)
            .ok_or_else(|| FlipbookError::validation(format!("unknown frame {frame}")))?;
        let cell = f
            .cell(layer)
            .ok_or_else(|| FlipbookError::validation(format!("unknown layer {layer}")))?;
        cell.bitmap()
    }

    /// Replace one layer's bitmap on one frame and invalidate that frame's thumbnail.
    ///
    /// Rejected while the target is leased to a [`DrawingSession`].
    pub fn set_bitmap(
        &mut self,
        frame: FrameId,
        layer: LayerId,
        bitmap: Bitmap,
    ) -> FlipbookResult<()> {
        if self.lease == Some((frame, layer)) {
            return Err(FlipbookError::validation(
                "layer bitmap is held by an active drawing session",
            ));
        }
        self.replace_cell(frame, layer, bitmap)
    }

    fn replace_cell(&mut self, frame: FrameId, layer: LayerId, bitmap: Bitmap) -> FlipbookResult<()> {
        if self.layer(layer).is_none() {
            return Err(FlipbookError::validation(format!("unknown layer {layer}")));
        }
        if bitmap.size() != self.canvas {
            return Err(FlipbookError::validation(format!(
                "bitmap is {}x{}, canvas is {}x{}",
                bitmap.width(),
                bitmap.height(),
                self.canvas.width,
                self.canvas.height
            )));
        }
        self.frame_mut(frame)?
            .set_cell(layer, LayerImage::from_bitmap(bitmap));
        Ok(())
    }

    /// Create a layer directly above `after` (or on top), with a blank bitmap on every frame.
    pub fn create_layer(&mut self, after: Option<LayerId>) -> Layer {
        let layer = Layer::new(format!("Layer {}", self.layers.len() + 1));
        let at = after
            .and_then(|id| self.layer_index(id))
            .map_or(self.layers.len(), |i| i + 1);
        self.layers.insert(at, layer.clone());
        let blank = Arc::new(Bitmap::blank(self.canvas));
        for frame in &mut self.frames {
            frame.set_cell(layer.id, LayerImage::Decoded(Arc::clone(&blank)));
        }
        tracing::debug!(layer = %layer.id, index = at, "layer created");
        layer
    }

    /// Remove a layer and its bitmaps. Refuses to remove the last layer or a leased one.
    pub fn remove_layer(&mut self, id: LayerId) -> bool {
        if self.layers.len() <= 1 {
            tracing::debug!(layer = %id, "refusing to remove the last layer");
            return false;
        }
        if self.lease.is_some_and(|(_, l)| l == id) {
            return false;
        }
        let Some(idx) = self.layer_index(id) else {
            return false;
        };
        self.layers.remove(idx);
        for frame in &mut self.frames {
            frame.cells.remove(&id);
            frame.invalidate_thumbnail();
        }
        true
    }

    /// Move a layer to stack position `to` (clamped).
    pub fn move_layer(&mut self, id: LayerId, to: usize) -> bool {
        let Some(from) = self.layer_index(id) else {
            return false;
        };
        let to = to.min(self.layers.len() - 1);
        if from == to {
            return false;
        }
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
        self.invalidate_all();
        true
    }

    fn update_layer(&mut self, id: LayerId, f: impl FnOnce(&mut Layer)) -> bool {
        let Some(layer) = self.layers.iter_mut().find(|l| l.id == id) else {
            return false;
        };
        f(layer);
        self.invalidate_all();
        true
    }

    /// Rename a layer.
    pub fn rename_layer(&mut self, id: LayerId, name: impl Into<String>) -> bool {
        let name = name.into();
        self.update_layer(id, |l| l.name = name)
    }

    /// Show or hide a layer.
    pub fn set_layer_visible(&mut self, id: LayerId, visible: bool) -> bool {
        self.update_layer(id, |l| l.visible = visible)
    }

    /// Lock or unlock a layer.
    pub fn set_layer_locked(&mut self, id: LayerId, locked: bool) -> bool {
        self.update_layer(id, |l| l.locked = locked)
    }

    /// Set a layer's opacity, clamped to `[0, 1]`.
    pub fn set_layer_opacity(&mut self, id: LayerId, opacity: f32) -> bool {
        let opacity = if opacity.is_finite() {
            opacity.clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.update_layer(id, |l| l.opacity = opacity)
    }

    /// Set a layer's blend mode.
    pub fn set_layer_blend_mode(&mut self, id: LayerId, mode: BlendMode) -> bool {
        self.update_layer(id, |l| l.blend_mode = mode)
    }

    /// Insert a blank frame after position `after` (or at the end).
    pub fn add_frame(&mut self, after: Option<usize>) -> FrameId {
        let mut frame = Frame::new();
        let blank = Arc::new(Bitmap::blank(self.canvas));
        for layer in &self.layers {
            frame.set_cell(layer.id, LayerImage::Decoded(Arc::clone(&blank)));
        }
        let id = frame.id;
        let at = after.map_or(self.frames.len(), |i| (i + 1).min(self.frames.len()));
        self.frames.insert(at, frame);
        id
    }

    /// Insert a copy of `id` right after it. The copy shares pixels until either side is edited.
    pub fn duplicate_frame(&mut self, id: FrameId) -> Option<FrameId> {
        let idx = self.frame_index(id)?;
        let mut copy = self.frames[idx].clone();
        copy.id = FrameId::new();
        let new_id = copy.id;
        self.frames.insert(idx + 1, copy);
        Some(new_id)
    }

    /// Delete a frame. Refuses to delete the last frame or a leased one.
    pub fn remove_frame(&mut self, id: FrameId) -> bool {
        if self.frames.len() <= 1 || self.lease.is_some_and(|(f, _)| f == id) {
            return false;
        }
        let Some(idx) = self.frame_index(id) else {
            return false;
        };
        self.frames.remove(idx);
        true
    }

    /// Move a frame to timeline position `to` (clamped).
    pub fn move_frame(&mut self, id: FrameId, to: usize) -> bool {
        let Some(from) = self.frame_index(id) else {
            return false;
        };
        let to = to.min(self.frames.len() - 1);
        if from == to {
            return false;
        }
        let frame = self.frames.remove(from);
        self.frames.insert(to, frame);
        true
    }

    /// Crop or extend every bitmap to `size`, anchored at the top-left corner.
    ///
    /// Cells that fail to decode are replaced by blank bitmaps.
    pub fn resize_canvas(&mut self, size: CanvasSize) -> bool {
        if size == self.canvas || self.lease.is_some() {
            return false;
        }
        for frame in &mut self.frames {
            for cell in frame.cells.values_mut() {
                let resized = match cell.bitmap() {
                    Ok(bmp) => bmp.resize_canvas(size),
                    Err(err) => {
                        tracing::warn!(error = %err, "dropping undecodable bitmap on canvas resize");
                        Bitmap::blank(size)
                    }
                };
                *cell = LayerImage::from_bitmap(resized);
            }
            frame.invalidate_thumbnail();
        }
        self.canvas = size;
        true
    }

    /// Set or clear the background image.
    pub fn set_background_image(&mut self, image: Option<Bitmap>) {
        self.background_image = image.map(Arc::new);
        self.invalidate_all();
    }

    /// Full-size composite of a frame over `background`.
    pub fn composite(&self, frame: FrameId, background: &Background) -> Option<Bitmap> {
        let f = self.frame(frame)?;
        Some(compositor::composite(f, &self.layers, self.canvas, background))
    }

    /// Cached downscaled composite, rebuilt on demand after invalidation.
    pub fn thumbnail(&mut self, frame: FrameId, max_edge: u32) -> Option<Arc<Bitmap>> {
        let idx = self.frame_index(frame)?;
        let edge = max_edge.max(1).min(self.canvas.width.max(self.canvas.height));
        if let Some(cached) = self.frames[idx].cached_thumbnail()
            && cached.width().max(cached.height()) == edge
        {
            return Some(Arc::clone(cached));
        }
        let full = compositor::composite(&self.frames[idx], &self.layers, self.canvas, &self.background());
        let thumb = Arc::new(full.thumbnail(max_edge));
        self.frames[idx].thumbnail = Some(Arc::clone(&thumb));
        Some(thumb)
    }

    /// Neighbouring frames' composites drawn translucently, for motion reference.
    pub fn onion_skin(&self, frame: FrameId, opacity: f32) -> Option<Bitmap> {
        let idx = self.frame_index(frame)?;
        let neighbour = |i: Option<usize>| {
            i.and_then(|i| self.frames.get(i))
                .map(|f| compositor::composite(f, &self.layers, self.canvas, &Background::Transparent))
        };
        let prev = neighbour(idx.checked_sub(1));
        let next = neighbour(idx.checked_add(1));
        Some(compositor::onion_skin(
            prev.as_ref(),
            next.as_ref(),
            self.canvas,
            opacity,
        ))
    }

    /// Capture layers and frames for undo.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            layers: self.layers.clone(),
            frames: self.frames.clone(),
        }
    }

    /// Restore a captured state. Any drawing lease is dropped.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.layers = snapshot.layers.clone();
        self.frames = snapshot.frames.clone();
        self.lease = None;
        self.invalidate_all();
    }

    /// Take exclusive ownership of one layer bitmap for live drawing.
    ///
    /// Only one session can exist at a time, and only on an editable layer.
    pub fn begin_drawing(&mut self, frame: FrameId, layer: LayerId) -> Option<DrawingSession> {
        if self.lease.is_some() || !self.is_editable(layer) {
            return None;
        }
        let base = match self.get_bitmap(frame, layer) {
            Ok(bmp) => bmp,
            Err(err) => {
                tracing::warn!(error = %err, "cannot start drawing on this layer");
                return None;
            }
        };
        let base = if base.size() == self.canvas {
            base
        } else {
            Arc::new(base.resize_canvas(self.canvas))
        };
        let surface = base.as_ref().clone();
        self.lease = Some((frame, layer));
        Some(DrawingSession {
            frame,
            layer,
            base,
            surface,
        })
    }

    /// Flush a drawing session's surface into the store and release the lease.
    pub fn finish_drawing(&mut self, session: DrawingSession) -> bool {
        if self.lease != Some((session.frame, session.layer)) {
            return false;
        }
        self.lease = None;
        match self.replace_cell(session.frame, session.layer, session.surface) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "drawing session result discarded");
                false
            }
        }
    }

    /// Release a drawing session without writing anything back.
    pub fn cancel_drawing(&mut self, session: DrawingSession) {
        if self.lease == Some((session.frame, session.layer)) {
            self.lease = None;
        }
    }

    /// Whether a drawing session currently holds a lease.
    pub fn is_drawing(&self) -> bool {
        self.lease.is_some()
    }
}

/// Exclusive live drawing surface for one (frame, layer) cell.
///
/// Obtained from [`LayerStore::begin_drawing`]; the store rejects writes to the leased cell until
/// the session is handed back through [`LayerStore::finish_drawing`] or
/// [`LayerStore::cancel_drawing`].
#[must_use = "a drawing session must be finished or cancelled to release its lease"]
#[derive(Debug)]
pub struct DrawingSession {
    frame: FrameId,
    layer: LayerId,
    base: Arc<Bitmap>,
    surface: Bitmap,
}

impl DrawingSession {
    /// Frame being drawn on.
    pub fn frame(&self) -> FrameId {
        self.frame
    }

    /// Layer being drawn on.
    pub fn layer(&self) -> LayerId {
        self.layer
    }

    /// Live pixels.
    pub fn surface(&self) -> &Bitmap {
        &self.surface
    }

    /// Live pixels, for drawing.
    pub fn surface_mut(&mut self) -> &mut Bitmap {
        &mut self.surface
    }

    /// Throw away everything drawn so far (shape preview redraw).
    pub fn restore_base(&mut self) {
        self.surface.data_mut().copy_from_slice(self.base.data());
    }
}

#[cfg(test)]
#[path = "../../tests/unit/document/store.rs"]
mod tests;
