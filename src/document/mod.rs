//! Document model: layers, frames, the layer store, undo history and persistence.

/// Frames and their per-layer cells.
pub mod frame;
/// Bounded undo/redo.
pub mod history;
/// Layer metadata and blend modes.
pub mod layer;
/// Saved project layout and project stores.
pub mod project;
/// The raster layer store.
pub mod store;
