//! The floating selection: a lifted bitmap with a box, a quarter-turn rotation and flips.

use std::sync::Arc;

use crate::composite::blend::over_pixel;
use crate::foundation::core::{Affine, Point, Rect, Vec2, rotate_vec};
use crate::raster::bitmap::Bitmap;

/// Corner resize handles, named in the selection's unflipped local frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Handle {
    /// Top-left corner.
    TopLeft,
    /// Top-right corner.
    TopRight,
    /// Bottom-left corner.
    BottomLeft,
    /// Bottom-right corner.
    BottomRight,
}

impl Handle {
    /// All handles in hit-test order.
    pub const ALL: [Handle; 4] = [
        Handle::TopLeft,
        Handle::TopRight,
        Handle::BottomLeft,
        Handle::BottomRight,
    ];

    fn is_left(self) -> bool {
        matches!(self, Handle::TopLeft | Handle::BottomLeft)
    }

    fn is_top(self) -> bool {
        matches!(self, Handle::TopLeft | Handle::TopRight)
    }

    fn from_sides(left: bool, top: bool) -> Self {
        match (left, top) {
            (true, true) => Handle::TopLeft,
            (false, true) => Handle::TopRight,
            (true, false) => Handle::BottomLeft,
            (false, false) => Handle::BottomRight,
        }
    }

    /// Unit corner offset from the center in local space, `(-1|1, -1|1)`.
    fn corner_sign(self) -> Vec2 {
        Vec2::new(
            if self.is_left() { -1.0 } else { 1.0 },
            if self.is_top() { -1.0 } else { 1.0 },
        )
    }
}

/// Mirror axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlipAxis {
    /// Mirror left/right (negates `scale_x`).
    Horizontal,
    /// Mirror top/bottom (negates `scale_y`).
    Vertical,
}

/// A lifted region floating above its layer.
///
/// `x, y, width, height` is the unrotated box in canvas pixels; the box is rotated by
/// `rotation` degrees about its center and the content is mirrored by `scale_x`/`scale_y`,
/// which are always exactly `1.0` or `-1.0`.
#[derive(Clone, Debug, PartialEq)]
pub struct FloatingSelection {
    /// Left edge of the unrotated box.
    pub x: f64,
    /// Top edge of the unrotated box.
    pub y: f64,
    /// Box width, never below the engine's minimum after a resize.
    pub width: f64,
    /// Box height.
    pub height: f64,
    rotation: f64,
    scale_x: f64,
    scale_y: f64,
    bitmap: Arc<Bitmap>,
}

impl FloatingSelection {
    /// Float `bitmap` with its top-left corner at `(x, y)` and its natural size.
    pub fn new(x: f64, y: f64, bitmap: Bitmap) -> Self {
        Self {
            x,
            y,
            width: f64::from(bitmap.width()),
            height: f64::from(bitmap.height()),
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            bitmap: Arc::new(bitmap),
        }
    }

    /// The detached pixels.
    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    /// Rotation in degrees, in `[0, 360)`.
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Horizontal mirror sign.
    pub fn scale_x(&self) -> f64 {
        self.scale_x
    }

    /// Vertical mirror sign.
    pub fn scale_y(&self) -> f64 {
        self.scale_y
    }

    /// The unrotated box.
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    /// Rotation pivot.
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Translate by `delta`. The box may leave the canvas.
    pub fn move_by(&mut self, delta: Vec2) {
        self.x += delta.x;
        self.y += delta.y;
    }

    /// Quarter turn clockwise, normalized to `[0, 360)`.
    pub fn rotate_quarter(&mut self) {
        self.rotation = (self.rotation + 90.0).rem_euclid(360.0);
    }

    /// Toggle the mirror on one axis. Position and rotation are untouched.
    pub fn flip(&mut self, axis: FlipAxis) {
        match axis {
            FlipAxis::Horizontal => self.scale_x = -self.scale_x,
            FlipAxis::Vertical => self.scale_y = -self.scale_y,
        }
    }

    /// The box corner a visible handle actually drags.
    ///
    /// Handles are drawn in mirrored local space, so under a horizontal flip the handle shown
    /// top-left sits on the box's right edge (and likewise vertically).
    pub fn effective_handle(&self, handle: Handle) -> Handle {
        let left = handle.is_left() == (self.scale_x > 0.0);
        let top = handle.is_top() == (self.scale_y > 0.0);
        Handle::from_sides(left, top)
    }

    /// Resize by dragging `handle` by the screen-space canvas delta `delta`.
    ///
    /// The delta is taken into local space first (inverse rotation), the handle is remapped for
    /// flips, and each axis is clamped to `min_size` with the opposite edge held fixed.
    pub fn resize(&mut self, handle: Handle, delta: Vec2, min_size: f64) {
        let local = rotate_vec(delta, -self.rotation);
        let corner = self.effective_handle(handle);

        if corner.is_left() {
            let right = self.x + self.width;
            self.width -= local.x;
            if self.width < min_size {
                self.width = min_size;
            }
            self.x = right - self.width;
        } else {
            self.width = (self.width + local.x).max(min_size);
        }

        if corner.is_top() {
            let bottom = self.y + self.height;
            self.height -= local.y;
            if self.height < min_size {
                self.height = min_size;
            }
            self.y = bottom - self.height;
        } else {
            self.height = (self.height + local.y).max(min_size);
        }
    }

    /// Mirrored, rotated local point to canvas space.
    fn local_to_canvas(&self, local: Vec2) -> Point {
        let mirrored = Vec2::new(local.x * self.scale_x, local.y * self.scale_y);
        self.center() + rotate_vec(mirrored, self.rotation)
    }

    /// Where each handle is drawn, in canvas space.
    pub fn handle_positions(&self) -> [(Handle, Point); 4] {
        let half = Vec2::new(self.width / 2.0, self.height / 2.0);
        Handle::ALL.map(|h| {
            let s = h.corner_sign();
            (h, self.local_to_canvas(Vec2::new(s.x * half.x, s.y * half.y)))
        })
    }

    /// The handle within `radius` canvas units of `point`, if any.
    pub fn hit_handle(&self, point: Point, radius: f64) -> Option<Handle> {
        self.handle_positions()
            .into_iter()
            .find(|(_, p)| p.distance(point) <= radius)
            .map(|(h, _)| h)
    }

    /// Whether `point` lies inside the rotated box.
    pub fn contains(&self, point: Point) -> bool {
        let local = rotate_vec(point - self.center(), -self.rotation);
        local.x.abs() <= self.width / 2.0 && local.y.abs() <= self.height / 2.0
    }

    /// Bitmap pixel space to canvas space.
    pub fn transform(&self) -> Affine {
        let bw = f64::from(self.bitmap.width().max(1));
        let bh = f64::from(self.bitmap.height().max(1));
        Affine::translate(self.center().to_vec2())
            * Affine::rotate(self.rotation.to_radians())
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
            * Affine::translate((-self.width / 2.0, -self.height / 2.0))
            * Affine::scale_non_uniform(self.width / bw, self.height / bh)
    }

    /// Draw the transformed content over `target` (nearest-neighbour, source-over).
    pub fn draw_onto(&self, target: &mut Bitmap) {
        let xf = self.transform();
        if xf.determinant().abs() < f64::EPSILON {
            return;
        }
        let inv = xf.inverse();
        let bw = f64::from(self.bitmap.width());
        let bh = f64::from(self.bitmap.height());
        let area = xf.transform_rect_bbox(Rect::new(0.0, 0.0, bw, bh));
        let tw = target.width();
        let th = target.height();
        let x0 = area.x0.floor().clamp(0.0, f64::from(tw)) as u32;
        let y0 = area.y0.floor().clamp(0.0, f64::from(th)) as u32;
        let x1 = area.x1.ceil().clamp(0.0, f64::from(tw)) as u32;
        let y1 = area.y1.ceil().clamp(0.0, f64::from(th)) as u32;

        let src = self.bitmap.data();
        let stride = self.bitmap.width() as usize;
        let dst = target.data_mut();
        for py in y0..y1 {
            for px in x0..x1 {
                let p = inv * Point::new(f64::from(px) + 0.5, f64::from(py) + 0.5);
                if p.x < 0.0 || p.y < 0.0 || p.x >= bw || p.y >= bh {
                    continue;
                }
                let si = ((p.y as usize) * stride + (p.x as usize)) * 4;
                let di = ((py as usize) * (tw as usize) + (px as usize)) * 4;
                over_pixel(&mut dst[di..di + 4], &src[si..si + 4]);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/selection/floating.rs"]
mod tests;
