//! Selection transform engine: lift, transform and commit the floating selection.
//!
//! Guard rejections (no selection, locked/hidden/missing layer, too-small marquee) return
//! `false` and leave everything untouched. A selection remembers the frame it was lifted on
//! but not the layer: it is committed onto whichever layer the caller names as active.

use crate::document::frame::FrameId;
use crate::document::layer::LayerId;
use crate::document::store::LayerStore;
use crate::foundation::core::{Point, Rect, Vec2};
use crate::raster::bitmap::{Bitmap, PixelRect};
use crate::selection::floating::{FlipAxis, FloatingSelection, Handle};

/// What a pointer landed on, relative to the floating selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionHit {
    /// A resize handle.
    Handle(Handle),
    /// Inside the box.
    Body,
    /// Outside, or nothing is floating.
    Outside,
}

#[derive(Clone, Debug)]
struct Lifted {
    selection: FloatingSelection,
    frame: FrameId,
}

/// Owner of the single floating selection.
#[derive(Clone, Debug)]
pub struct SelectionEngine {
    lifted: Option<Lifted>,
    min_size: f64,
}

impl SelectionEngine {
    /// Engine enforcing `min_size` pixels per axis.
    pub fn new(min_size: f64) -> Self {
        Self {
            lifted: None,
            min_size: min_size.max(1.0),
        }
    }

    /// Minimum width/height.
    pub fn min_size(&self) -> f64 {
        self.min_size
    }

    /// The floating selection, if any.
    pub fn selection(&self) -> Option<&FloatingSelection> {
        self.lifted.as_ref().map(|l| &l.selection)
    }

    /// Frame the selection was lifted on or placed over.
    pub fn frame(&self) -> Option<FrameId> {
        self.lifted.as_ref().map(|l| l.frame)
    }

    /// Whether a selection is floating.
    pub fn is_floating(&self) -> bool {
        self.lifted.is_some()
    }

    /// Cut `rect` out of a layer into a new floating selection.
    ///
    /// The rectangle is clipped to the canvas and must be at least `min_size` on both axes.
    /// The source region is cleared immediately. Any selection already floating is committed
    /// onto `layer` first.
    pub fn lift(&mut self, store: &mut LayerStore, frame: FrameId, layer: LayerId, rect: Rect) -> bool {
        if !store.is_editable(layer) {
            tracing::debug!(layer = %layer, "lift rejected: layer not editable");
            return false;
        }
        let Some(region) = PixelRect::from_rect_clamped(rect, store.canvas_size()) else {
            return false;
        };
        if f64::from(region.width) < self.min_size || f64::from(region.height) < self.min_size {
            tracing::debug!(w = region.width, h = region.height, "lift rejected: marquee too small");
            return false;
        }
        self.settle(store, layer);
        let Ok(source) = store.get_bitmap(frame, layer) else {
            return false;
        };
        let Some(pixels) = source.extract(region) else {
            return false;
        };
        let mut remaining = source.as_ref().clone();
        remaining.clear_rect(region);
        if let Err(err) = store.set_bitmap(frame, layer, remaining) {
            tracing::warn!(error = %err, "lift aborted");
            return false;
        }
        self.lifted = Some(Lifted {
            selection: FloatingSelection::new(f64::from(region.x), f64::from(region.y), pixels),
            frame,
        });
        true
    }

    /// Float an externally produced bitmap (e.g. rasterized text) at `at` without touching the
    /// layer. Any selection already floating is committed onto `layer` first.
    pub fn place(
        &mut self,
        store: &mut LayerStore,
        frame: FrameId,
        layer: LayerId,
        bitmap: Bitmap,
        at: Point,
    ) -> bool {
        if !store.is_editable(layer) || store.frame(frame).is_none() {
            return false;
        }
        self.settle(store, layer);
        self.lifted = Some(Lifted {
            selection: FloatingSelection::new(at.x, at.y, bitmap),
            frame,
        });
        true
    }

    /// Classify `point` against the selection; handles win over the body.
    pub fn hit_test(&self, point: Point, handle_radius: f64) -> SelectionHit {
        let Some(sel) = self.selection() else {
            return SelectionHit::Outside;
        };
        if let Some(h) = sel.hit_handle(point, handle_radius) {
            return SelectionHit::Handle(h);
        }
        if sel.contains(point) {
            SelectionHit::Body
        } else {
            SelectionHit::Outside
        }
    }

    fn with_selection(&mut self, f: impl FnOnce(&mut FloatingSelection)) -> bool {
        match self.lifted.as_mut() {
            Some(l) => {
                f(&mut l.selection);
                true
            }
            None => false,
        }
    }

    /// Translate the selection.
    pub fn move_by(&mut self, delta: Vec2) -> bool {
        self.with_selection(|s| s.move_by(delta))
    }

    /// Drag a resize handle by a canvas-space delta.
    pub fn resize(&mut self, handle: Handle, delta: Vec2) -> bool {
        let min = self.min_size;
        self.with_selection(|s| s.resize(handle, delta, min))
    }

    /// Quarter turn.
    pub fn rotate(&mut self) -> bool {
        self.with_selection(FloatingSelection::rotate_quarter)
    }

    /// Mirror along `axis`.
    pub fn flip(&mut self, axis: FlipAxis) -> bool {
        self.with_selection(|s| s.flip(axis))
    }

    /// Draw the selection onto `layer` (the active layer) of its frame and drop it.
    ///
    /// Rejected (selection kept) when nothing floats, `layer` is locked, hidden or missing, or
    /// the frame no longer exists.
    #[tracing::instrument(level = "debug", skip_all, fields(layer = %layer))]
    pub fn commit(&mut self, store: &mut LayerStore, layer: LayerId) -> bool {
        let Some(lifted) = self.lifted.as_ref() else {
            return false;
        };
        if !store.is_editable(layer) {
            tracing::debug!("commit rejected: layer not editable");
            return false;
        }
        let Ok(current) = store.get_bitmap(lifted.frame, layer) else {
            tracing::debug!(frame = %lifted.frame, "commit rejected: frame gone");
            return false;
        };
        let mut merged = current.as_ref().clone();
        lifted.selection.draw_onto(&mut merged);
        if let Err(err) = store.set_bitmap(lifted.frame, layer, merged) {
            tracing::warn!(error = %err, "commit failed");
            return false;
        }
        self.lifted = None;
        true
    }

    /// Drop the selection without writing it back. The lifted pixels are lost.
    pub fn discard(&mut self) -> bool {
        self.lifted.take().is_some()
    }

    /// Commit onto `layer`, or discard when the commit is rejected. Used before frame
    /// navigation.
    pub fn settle(&mut self, store: &mut LayerStore, layer: LayerId) {
        if self.is_floating() && !self.commit(store, layer) {
            tracing::debug!("selection discarded");
            self.discard();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/selection/engine.rs"]
mod tests;
