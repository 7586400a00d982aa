use crate::foundation::core::{Point, Vec2};

/// Presentation transform: `screen = canvas * scale + pan`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    scale: f64,
    pan: Vec2,
    min_scale: f64,
    max_scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0.1, 10.0)
    }
}

impl Viewport {
    /// Identity viewport with zoom bounds.
    pub fn new(min_scale: f64, max_scale: f64) -> Self {
        Self {
            scale: 1.0,
            pan: Vec2::ZERO,
            min_scale,
            max_scale: max_scale.max(min_scale),
        }
    }

    /// Current zoom.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Current pan offset in screen pixels.
    pub fn pan(&self) -> Vec2 {
        self.pan
    }

    /// Clamp a zoom to the configured bounds.
    pub fn clamp_scale(&self, scale: f64) -> f64 {
        if scale.is_finite() {
            scale.clamp(self.min_scale, self.max_scale)
        } else {
            self.scale
        }
    }

    /// Screen position to canvas position.
    pub fn screen_to_canvas(&self, p: Point) -> Point {
        ((p.to_vec2() - self.pan) / self.scale).to_point()
    }

    /// Canvas position to screen position.
    pub fn canvas_to_screen(&self, p: Point) -> Point {
        (p.to_vec2() * self.scale + self.pan).to_point()
    }

    /// Shift by a screen-space delta.
    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Set the zoom, keeping the canvas point under `anchor` (screen space) fixed.
    pub fn zoom_about(&mut self, anchor: Point, scale: f64) {
        let scale = self.clamp_scale(scale);
        let canvas = self.screen_to_canvas(anchor);
        self.scale = scale;
        self.pan = anchor.to_vec2() - canvas.to_vec2() * scale;
    }

    /// Mouse-wheel zoom about `anchor`; negative `delta` zooms in.
    pub fn wheel(&mut self, anchor: Point, delta: f64) {
        let factor = 1.1f64.powf(-delta / 100.0);
        self.zoom_about(anchor, self.scale * factor);
    }

    /// Back to identity.
    pub fn reset(&mut self) {
        self.scale = 1.0;
        self.pan = Vec2::ZERO;
    }

    pub(crate) fn set(&mut self, scale: f64, pan: Vec2) {
        self.scale = self.clamp_scale(scale);
        self.pan = pan;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/editor/viewport.rs"]
mod tests;
