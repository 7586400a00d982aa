//! Scanline seed fill over a premultiplied bitmap.
//!
//! Colors are compared exactly on all four channels; there is no tolerance.

use crate::raster::bitmap::Bitmap;

/// Outcome of a [`flood_fill`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FillStats {
    /// Pixels written.
    pub filled: usize,
    /// Seeds popped from the stack.
    pub iterations: usize,
    /// The iteration cap (width x height) stopped the fill early.
    pub capped: bool,
}

/// Fill the 4-connected region of pixels equal to the color at `(start_x, start_y)` with `fill`.
///
/// `fill` is a premultiplied pixel. The fill is a no-op when the seed is outside the bitmap or
/// already has the fill color.
#[tracing::instrument(skip(bitmap), fields(w = bitmap.width(), h = bitmap.height()))]
pub fn flood_fill(bitmap: &mut Bitmap, start_x: u32, start_y: u32, fill: [u8; 4]) -> FillStats {
    let mut stats = FillStats::default();
    let Some(target) = bitmap.pixel(start_x, start_y) else {
        return stats;
    };
    if target == fill {
        return stats;
    }

    let width = bitmap.width();
    let height = bitmap.height();
    let cap = (width as usize) * (height as usize);
    let matches = |bmp: &Bitmap, x: u32, y: u32| bmp.pixel(x, y) == Some(target);

    let mut stack: Vec<(u32, u32)> = Vec::with_capacity(64);
    stack.push((start_x, start_y));

    while let Some((sx, sy)) = stack.pop() {
        stats.iterations += 1;
        if stats.iterations > cap {
            stats.capped = true;
            tracing::warn!(cap, "flood fill hit its iteration cap");
            break;
        }
        if !matches(bitmap, sx, sy) {
            continue;
        }

        let mut x = sx;
        while x > 0 && matches(bitmap, x - 1, sy) {
            x -= 1;
        }

        let mut span_above = false;
        let mut span_below = false;
        while x < width && matches(bitmap, x, sy) {
            bitmap.set_pixel(x, sy, fill);
            stats.filled += 1;

            if sy > 0 {
                let hit = matches(bitmap, x, sy - 1);
                if hit && !span_above {
                    stack.push((x, sy - 1));
                    span_above = true;
                } else if !hit {
                    span_above = false;
                }
            }
            if sy + 1 < height {
                let hit = matches(bitmap, x, sy + 1);
                if hit && !span_below {
                    stack.push((x, sy + 1));
                    span_below = true;
                } else if !hit {
                    span_below = false;
                }
            }
            x += 1;
        }
    }

    tracing::debug!(filled = stats.filled, iterations = stats.iterations, "flood fill done");
    stats
}

#[cfg(test)]
#[path = "../../tests/unit/raster/flood_fill.rs"]
mod tests;
