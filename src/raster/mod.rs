//! Premultiplied RGBA8 bitmaps and the pixel operations tools perform on them.

/// Bitmap storage, encode/decode and region helpers.
pub mod bitmap;
/// Brush strokes and shapes.
pub mod draw;
/// Scanline flood fill.
pub mod flood_fill;
