//! Error types shared across SignGate crates.

use std::path::PathBuf;

/// Top-level error type for SignGate operations.
#[derive(Debug, thiserror::Error)]
pub enum SigngateError {
    /// A scorer was handed a window with fewer than `capacity` frames.
    #[error("Incomplete buffer: {len} of {capacity} frames")]
    IncompleteBuffer { len: usize, capacity: usize },

    /// The classifier failed or timed out; skip this tick.
    #[error("Classifier unavailable: {message}")]
    ClassifierUnavailable { message: String },

    /// The video source has no more frames.
    #[error("Source exhausted")]
    SourceExhausted,

    /// A captured sample could not be written.
    #[error("Persistence failure: {message}")]
    PersistenceFailure { message: String },

    #[error("Shape mismatch: expected {expected} values, got {actual}")]
    Shape { expected: usize, actual: usize },

    #[error("Source error: {message}")]
    Source { message: String },

    #[error("Model error: {message}")]
    Model { message: String },

    #[error("Session error: {message}")]
    Session { message: String },

    #[error("Notification error: {message}")]
    Notification { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using SigngateError.
pub type SigngateResult<T> = Result<T, SigngateError>;

impl SigngateError {
    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::ClassifierUnavailable {
            message: msg.into(),
        }
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::PersistenceFailure {
            message: msg.into(),
        }
    }

    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source {
            message: msg.into(),
        }
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model {
            message: msg.into(),
        }
    }

    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session {
            message: msg.into(),
        }
    }

    pub fn notification(msg: impl Into<String>) -> Self {
        Self::Notification {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether this error ends a session.
    ///
    /// Everything else is recoverable within the current tick.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::SourceExhausted)
    }
}
