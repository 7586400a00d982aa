//! Layer blending and frame compositing.

/// Per-pixel blend modes.
pub mod blend;
/// Frame flattening, onion skin and flattening for encoders.
pub mod compositor;
