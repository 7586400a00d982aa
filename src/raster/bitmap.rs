use std::fmt;
use std::io::Cursor;

use crate::foundation::core::{CanvasSize, Rect, Rgba8};
use crate::foundation::error::{FlipbookError, FlipbookResult};
use crate::foundation::math::{premul_channel, unpremul_channel};

/// A raster grid of premultiplied RGBA8 pixels, tightly packed and row-major.
///
/// Bitmaps are treated as values: the layer store only ever swaps whole buffers, so a bitmap
/// handed out behind an `Arc` is never mutated in place.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Half-open integer pixel rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelRect {
    /// Snap `rect` to whole pixels and intersect it with a canvas of `size`.
    ///
    /// Returns `None` when nothing of the rectangle lies on the canvas.
    pub fn from_rect_clamped(rect: Rect, size: CanvasSize) -> Option<Self> {
        let rect = rect.abs();
        let x0 = rect.x0.round().clamp(0.0, f64::from(size.width));
        let y0 = rect.y0.round().clamp(0.0, f64::from(size.height));
        let x1 = rect.x1.round().clamp(0.0, f64::from(size.width));
        let y1 = rect.y1.round().clamp(0.0, f64::from(size.height));
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Self {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }

    /// The rectangle in floating-point canvas space.
    pub fn to_rect(self) -> Rect {
        Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.x + self.width),
            f64::from(self.y + self.height),
        )
    }
}

impl Bitmap {
    /// Allocate a fully transparent bitmap.
    pub fn new(width: u32, height: u32) -> FlipbookResult<Self> {
        let size = CanvasSize::new(width, height)?;
        Ok(Self::blank(size))
    }

    /// Allocate a fully transparent bitmap for a (validated) canvas size.
    pub fn blank(size: CanvasSize) -> Self {
        Self {
            width: size.width,
            height: size.height,
            data: vec![0u8; size.pixel_count() * 4],
        }
    }

    /// A bitmap uniformly filled with `color`.
    pub fn filled(size: CanvasSize, color: Rgba8) -> Self {
        let mut bmp = Self::blank(size);
        bmp.fill(color);
        bmp
    }

    /// Wrap premultiplied RGBA8 bytes.
    pub fn from_premul_rgba8(width: u32, height: u32, data: Vec<u8>) -> FlipbookResult<Self> {
        let size = CanvasSize::new(width, height)?;
        if data.len() != size.pixel_count() * 4 {
            return Err(FlipbookError::validation(format!(
                "bitmap data length {} does not match {width}x{height}x4",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Wrap straight-alpha RGBA8 bytes, premultiplying them.
    pub fn from_straight_rgba8(width: u32, height: u32, mut data: Vec<u8>) -> FlipbookResult<Self> {
        for px in data.chunks_exact_mut(4) {
            let a = px[3];
            px[0] = premul_channel(px[0], a);
            px[1] = premul_channel(px[1], a);
            px[2] = premul_channel(px[2], a);
        }
        Self::from_premul_rgba8(width, height, data)
    }

    /// Decode an encoded image (PNG, JPEG, ...) into a premultiplied bitmap.
    pub fn decode(bytes: &[u8]) -> FlipbookResult<Self> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| FlipbookError::decode(format!("decode image from memory: {e}")))?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::from_straight_rgba8(width, height, rgba.into_raw())
    }

    /// Encode as PNG (straight alpha).
    pub fn encode_png(&self) -> FlipbookResult<Vec<u8>> {
        let img = image::RgbaImage::from_raw(self.width, self.height, self.to_straight_rgba8())
            .ok_or_else(|| FlipbookError::validation("bitmap buffer size mismatch"))?;
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| FlipbookError::Other(anyhow::anyhow!("encode png: {e}")))?;
        Ok(buf)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Dimensions as a canvas size.
    pub fn size(&self) -> CanvasSize {
        CanvasSize {
            width: self.width,
            height: self.height,
        }
    }

    /// Premultiplied RGBA8 bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable premultiplied RGBA8 bytes.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Straight-alpha copy of the pixel data.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        for px in out.chunks_exact_mut(4) {
            let a = px[3];
            px[0] = unpremul_channel(px[0], a);
            px[1] = unpremul_channel(px[1], a);
            px[2] = unpremul_channel(px[2], a);
        }
        out
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(((y as usize) * (self.width as usize) + (x as usize)) * 4)
    }

    /// Premultiplied pixel at `(x, y)`, or `None` outside the bitmap.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let i = self.offset(x, y)?;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Overwrite the pixel at `(x, y)`. Returns `false` outside the bitmap.
    pub fn set_pixel(&mut self, x: u32, y: u32, px: [u8; 4]) -> bool {
        match self.offset(x, y) {
            Some(i) => {
                self.data[i..i + 4].copy_from_slice(&px);
                true
            }
            None => false,
        }
    }

    /// Fill every pixel with `color`.
    pub fn fill(&mut self, color: Rgba8) {
        let px = color.to_premul();
        for d in self.data.chunks_exact_mut(4) {
            d.copy_from_slice(&px);
        }
    }

    /// `true` when every pixel is fully transparent.
    pub fn is_blank(&self) -> bool {
        self.data.chunks_exact(4).all(|px| px[3] == 0)
    }

    /// Copy a region out into a new bitmap. The region is clipped to the bitmap.
    pub fn extract(&self, rect: PixelRect) -> Option<Self> {
        let rect = PixelRect::from_rect_clamped(rect.to_rect(), self.size())?;
        let mut out = Self::blank(CanvasSize {
            width: rect.width,
            height: rect.height,
        });
        let row_bytes = (rect.width as usize) * 4;
        for row in 0..rect.height {
            let src = ((rect.y + row) as usize * self.width as usize + rect.x as usize) * 4;
            let dst = (row as usize) * row_bytes;
            out.data[dst..dst + row_bytes].copy_from_slice(&self.data[src..src + row_bytes]);
        }
        Some(out)
    }

    /// Make a region fully transparent. The region is clipped to the bitmap.
    pub fn clear_rect(&mut self, rect: PixelRect) {
        let Some(rect) = PixelRect::from_rect_clamped(rect.to_rect(), self.size()) else {
            return;
        };
        let row_bytes = (rect.width as usize) * 4;
        for row in 0..rect.height {
            let start = ((rect.y + row) as usize * self.width as usize + rect.x as usize) * 4;
            self.data[start..start + row_bytes].fill(0);
        }
    }

    /// Crop or extend to `size`, keeping content anchored at the top-left corner.
    pub fn resize_canvas(&self, size: CanvasSize) -> Self {
        let mut out = Self::blank(size);
        let w = self.width.min(size.width) as usize;
        let h = self.height.min(size.height);
        for y in 0..h {
            let src = (y as usize) * (self.width as usize) * 4;
            let dst = (y as usize) * (size.width as usize) * 4;
            out.data[dst..dst + w * 4].copy_from_slice(&self.data[src..src + w * 4]);
        }
        out
    }

    /// Resample to `size` (bilinear, on premultiplied data).
    pub fn scaled(&self, size: CanvasSize) -> Self {
        if size == self.size() {
            return self.clone();
        }
        let Some(img) = image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
        else {
            return Self::blank(size);
        };
        let resized = image::imageops::resize(
            &img,
            size.width,
            size.height,
            image::imageops::FilterType::Triangle,
        );
        Self {
            width: size.width,
            height: size.height,
            data: resized.into_raw(),
        }
    }

    /// Downscale so the longest edge is at most `max_edge`, keeping the aspect ratio.
    pub fn thumbnail(&self, max_edge: u32) -> Self {
        let max_edge = max_edge.max(1);
        let longest = self.width.max(self.height);
        if longest <= max_edge {
            return self.clone();
        }
        let scale = f64::from(max_edge) / f64::from(longest);
        let size = CanvasSize {
            width: ((f64::from(self.width) * scale).round() as u32).max(1),
            height: ((f64::from(self.height) * scale).round() as u32).max(1),
        };
        self.scaled(size)
    }

    /// Borrow the pixels as a `tiny-skia` drawing target.
    pub(crate) fn pixmap_mut(&mut self) -> Option<tiny_skia::PixmapMut<'_>> {
        tiny_skia::PixmapMut::from_bytes(&mut self.data, self.width, self.height)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/bitmap.rs"]
mod tests;
