//! Video export.
//!
//! The pipeline composites each frame and presents it to a [`sink::CaptureSink`], optionally
//! with a mixed soundtrack.

/// Audio decode, mix and staging.
pub mod audio;
/// `ffmpeg` capture sink and codec probe.
pub mod ffmpeg;
/// Frame loop, pacing and format negotiation.
pub mod pipeline;
/// Capture sink trait and the in-memory sink.
pub mod sink;
