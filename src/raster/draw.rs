//! Brush and shape rasterization into a [`Bitmap`] through `tiny-skia`.

use tiny_skia::{FillRule, LineCap, LineJoin, Paint, PathBuilder, Stroke, Transform};

use crate::foundation::core::{Point, Rect, Rgba8};
use crate::raster::bitmap::Bitmap;

/// How a brush touches the pixels it covers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BrushStyle {
    /// Paint color (ignored when erasing).
    pub color: Rgba8,
    /// Stroke width in canvas pixels.
    pub width: f32,
    /// Remove coverage instead of painting.
    pub erase: bool,
}

/// Shape primitives of the shape tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShapeKind {
    /// Axis-aligned rectangle spanned by the drag.
    Rectangle,
    /// Ellipse inscribed in the dragged rectangle.
    Ellipse,
    /// Straight line from drag start to drag end.
    Line,
}

fn paint_for(style: BrushStyle) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.anti_alias = true;
    if style.erase {
        paint.set_color_rgba8(0, 0, 0, 255);
        paint.blend_mode = tiny_skia::BlendMode::DestinationOut;
    } else {
        let c = style.color;
        paint.set_color_rgba8(c.r, c.g, c.b, c.a);
    }
    paint
}

fn stroke_for(style: BrushStyle) -> Stroke {
    Stroke {
        width: style.width.max(0.5),
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    }
}

/// Stamp a round dot of the brush diameter centered on `at`.
///
/// This is what a tap without movement leaves behind.
pub fn stamp_dot(bitmap: &mut Bitmap, at: Point, style: BrushStyle) {
    let radius = (style.width.max(1.0)) / 2.0;
    let Some(path) = PathBuilder::from_circle(at.x as f32, at.y as f32, radius) else {
        return;
    };
    let paint = paint_for(style);
    if let Some(mut pixmap) = bitmap.pixmap_mut() {
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }
}

/// Stroke one segment of a freehand path.
pub fn stroke_segment(bitmap: &mut Bitmap, from: Point, to: Point, style: BrushStyle) {
    if from.distance(to) < 1e-3 {
        stamp_dot(bitmap, to, style);
        return;
    }
    let mut pb = PathBuilder::new();
    pb.move_to(from.x as f32, from.y as f32);
    pb.line_to(to.x as f32, to.y as f32);
    let Some(path) = pb.finish() else {
        return;
    };
    let paint = paint_for(style);
    let stroke = stroke_for(style);
    if let Some(mut pixmap) = bitmap.pixmap_mut() {
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
}

/// Stroke a whole polyline. A single point renders a dot.
pub fn stroke_polyline(bitmap: &mut Bitmap, points: &[Point], style: BrushStyle) {
    match points {
        [] => {}
        [only] => stamp_dot(bitmap, *only, style),
        [first, rest @ ..] => {
            let mut pb = PathBuilder::new();
            pb.move_to(first.x as f32, first.y as f32);
            for p in rest {
                pb.line_to(p.x as f32, p.y as f32);
            }
            match pb.finish() {
                Some(path) => {
                    let paint = paint_for(style);
                    let stroke = stroke_for(style);
                    if let Some(mut pixmap) = bitmap.pixmap_mut() {
                        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
                    }
                }
                None => stamp_dot(bitmap, *first, style),
            }
        }
    }
}

/// Draw a shape spanned by the drag from `a` to `b`, outlined or filled.
pub fn draw_shape(
    bitmap: &mut Bitmap,
    kind: ShapeKind,
    a: Point,
    b: Point,
    style: BrushStyle,
    filled: bool,
) {
    if kind == ShapeKind::Line {
        stroke_segment(bitmap, a, b, style);
        return;
    }

    let r = Rect::from_points(a, b).abs();
    let Some(rect) =
        tiny_skia::Rect::from_ltrb(r.x0 as f32, r.y0 as f32, r.x1 as f32, r.y1 as f32)
    else {
        // Zero-area drag: fall back to the stroke of the degenerate outline.
        stroke_segment(bitmap, a, b, style);
        return;
    };
    let path = match kind {
        ShapeKind::Rectangle => Some(PathBuilder::from_rect(rect)),
        ShapeKind::Ellipse => PathBuilder::from_oval(rect),
        ShapeKind::Line => None,
    };
    let Some(path) = path else {
        return;
    };

    let paint = paint_for(style);
    if let Some(mut pixmap) = bitmap.pixmap_mut() {
        if filled {
            pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        } else {
            let stroke = stroke_for(style);
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/draw.rs"]
mod tests;
