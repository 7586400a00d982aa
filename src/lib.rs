//! Flipbook is the core of a frame-by-frame raster animation editor.
//!
//! - Keep a document of layered raster frames in a [`LayerStore`]
//! - Drive drawing, selection and gestures through an [`EditorSession`]
//! - Flatten frames with the compositor and export them through a [`CaptureSink`]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod foundation;

/// Layer blending and frame compositing.
pub mod composite;
/// Document model and persistence.
pub mod document;
/// Interactive editing.
pub mod editor;
/// Video export.
pub mod export;
/// Bitmaps and pixel operations.
pub mod raster;
/// Floating selection.
pub mod selection;

pub use crate::foundation::core::{
    Affine, CanvasSize, Point, Rect, Rgba8, Vec2, frame_interval, rotate_vec,
};
pub use crate::foundation::error::{FlipbookError, FlipbookResult};

pub use crate::composite::blend::blend;
pub use crate::composite::compositor::{Background, composite, flatten_onto, onion_skin};
pub use crate::document::frame::{Frame, FrameId, LayerImage};
pub use crate::document::history::{History, Snapshot};
pub use crate::document::layer::{BlendMode, Layer, LayerId};
pub use crate::document::project::{
    AudioTrack, DirProjectStore, MemoryProjectStore, Project, ProjectId, ProjectStore,
    ProjectSummary,
};
pub use crate::document::store::{DrawingSession, LayerStore};
pub use crate::editor::pointer::{PointerButton, PointerEvent, PointerId};
pub use crate::editor::session::{EditorConfig, EditorSession, Mode};
pub use crate::editor::text::{SvgTextRenderer, TextRenderer};
pub use crate::editor::tool::{Tool, ToolSettings};
pub use crate::editor::viewport::Viewport;
pub use crate::export::ffmpeg::{CodecProbe, FfmpegProbe, FfmpegSink, FfmpegSinkOpts, FixedProbe};
pub use crate::export::pipeline::{ExportOpts, ExportReport, Exporter, Pacing};
pub use crate::export::sink::{CaptureConfig, CaptureSink, ExportFormat, InMemorySink};
pub use crate::raster::bitmap::{Bitmap, PixelRect};
pub use crate::raster::draw::{BrushStyle, ShapeKind};
pub use crate::raster::flood_fill::{FillStats, flood_fill};
pub use crate::selection::engine::{SelectionEngine, SelectionHit};
pub use crate::selection::floating::{FlipAxis, FloatingSelection, Handle};
