//! Error types for body construction.
//!
//! Once a body exists, its facade never returns errors: failed commands
//! report `false` or `None`, and failures inside background actions are
//! logged. Only building a body can fail.

/// Result type alias for body construction.
pub type Result<T> = std::result::Result<T, BodyError>;

#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    /// Bodies spawn background actions and must be built inside a Tokio runtime.
    #[error("No Tokio runtime available to run body actions")]
    NoRuntime,

    /// The configuration describes a body this crate cannot drive.
    #[error("Unsupported body type: {0}")]
    UnsupportedBody(String),

    /// The configuration itself is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] avatar_core::Error),
}

impl From<tokio::runtime::TryCurrentError> for BodyError {
    fn from(_: tokio::runtime::TryCurrentError) -> Self {
        Self::NoRuntime
    }
}
