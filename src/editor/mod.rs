//! Interactive editing: tools, pointer tracking, viewport, text and the session state machine.

/// Pointer samples and buttons.
pub mod pointer;
/// The editing session and its mode state machine.
pub mod session;
/// Text rasterization.
pub mod text;
/// Tools and their settings.
pub mod tool;
/// Zoom and pan.
pub mod viewport;
