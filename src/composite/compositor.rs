use std::sync::Arc;

use crate::composite::blend::{blend_in_place, over_pixel};
use crate::document::frame::Frame;
use crate::document::layer::{BlendMode, Layer};
use crate::foundation::core::{CanvasSize, Rgba8};
use crate::raster::bitmap::Bitmap;

/// What a composite is drawn on top of.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Background {
    /// Fully transparent.
    #[default]
    Transparent,
    /// A flat color.
    Solid(Rgba8),
    /// An image stretched to fill the canvas.
    Image(Arc<Bitmap>),
}

impl Background {
    fn paint(&self, size: CanvasSize) -> Bitmap {
        match self {
            Self::Transparent => Bitmap::blank(size),
            Self::Solid(color) => Bitmap::filled(size, *color),
            Self::Image(img) => img.scaled(size),
        }
    }
}

/// Flatten one frame's layer stack into a single bitmap.
///
/// Layers are drawn bottom (`layers[0]`) to top over the background. Hidden layers are skipped
/// outright. A cell that is missing or fails to decode is skipped with a warning; the rest of
/// the stack is still composited in order. The output depends only on the inputs.
#[tracing::instrument(level = "debug", skip_all, fields(frame = %frame.id, w = size.width, h = size.height))]
pub fn composite(
    frame: &Frame,
    layers: &[Layer],
    size: CanvasSize,
    background: &Background,
) -> Bitmap {
    let mut out = background.paint(size);
    for layer in layers.iter().filter(|l| l.visible) {
        let Some(cell) = frame.cell(layer.id) else {
            tracing::warn!(layer = %layer.id, "frame has no bitmap for layer, skipping");
            continue;
        };
        let bmp = match cell.bitmap() {
            Ok(bmp) => bmp,
            Err(err) => {
                tracing::warn!(layer = %layer.id, error = %err, "layer bitmap failed to load, skipping");
                continue;
            }
        };
        draw_layer(&mut out, &bmp, layer.blend_mode, layer.opacity);
    }
    out
}

fn draw_layer(out: &mut Bitmap, bmp: &Bitmap, mode: BlendMode, opacity: f32) {
    let fitted;
    let src = if bmp.size() == out.size() {
        bmp
    } else {
        fitted = bmp.resize_canvas(out.size());
        &fitted
    };
    if let Err(err) = blend_in_place(out.data_mut(), src.data(), mode, opacity) {
        tracing::warn!(error = %err, "layer blend failed, skipping");
    }
}

/// Translucent overlay of the neighbouring frames' composites for motion reference.
///
/// Each present neighbour is drawn at `opacity` over a transparent canvas, previous first.
pub fn onion_skin(
    previous: Option<&Bitmap>,
    next: Option<&Bitmap>,
    size: CanvasSize,
    opacity: f32,
) -> Bitmap {
    let mut out = Bitmap::blank(size);
    for neighbour in [previous, next].into_iter().flatten() {
        draw_layer(&mut out, neighbour, BlendMode::Normal, opacity);
    }
    out
}

/// Flatten a premultiplied bitmap over an opaque color.
///
/// Encoders want fully opaque frames; anything left translucent by the layers shows `color`.
pub fn flatten_onto(bitmap: &Bitmap, color: Rgba8) -> Bitmap {
    let mut out = Bitmap::filled(bitmap.size(), Rgba8 { a: 255, ..color });
    for (d, s) in out
        .data_mut()
        .chunks_exact_mut(4)
        .zip(bitmap.data().chunks_exact(4))
    {
        over_pixel(d, s);
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/composite/compositor.rs"]
mod tests;
