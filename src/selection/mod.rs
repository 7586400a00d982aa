//! Floating selection: geometry and the lift/transform/commit engine.

/// Lift, transform, commit and discard.
pub mod engine;
/// Selection geometry, handles and placement.
pub mod floating;
