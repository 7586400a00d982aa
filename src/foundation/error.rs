/// Result alias used across the crate.
pub type FlipbookResult<T> = Result<T, FlipbookError>;

/// Errors surfaced by the editor core, persistence boundary and export pipeline.
///
/// Invariant-guard rejections (removing the last layer, committing without a selection, ...)
/// are not errors; those calls report `false` instead.
#[derive(thiserror::Error, Debug)]
pub enum FlipbookError {
    /// Malformed input (bad dimensions, unknown ids, inconsistent project data).
    #[error("validation error: {0}")]
    Validation(String),

    /// An image or audio payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The persistence backend ran out of space; nothing was written.
    #[error("storage full: {0}")]
    StorageFull(String),

    /// A required platform capability (codec, container, tool) is missing.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Failure while driving a capture sink or encoder process.
    #[error("export error: {0}")]
    Export(String),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Anything else, with context attached by `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FlipbookError {
    /// Build a [`FlipbookError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`FlipbookError::Decode`].
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`FlipbookError::StorageFull`].
    pub fn storage_full(msg: impl Into<String>) -> Self {
        Self::StorageFull(msg.into())
    }

    /// Build a [`FlipbookError::Unsupported`].
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Build a [`FlipbookError::Export`].
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Build a [`FlipbookError::Serde`].
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for FlipbookError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
