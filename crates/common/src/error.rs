//! Error types shared across FormCoach crates.

use std::path::PathBuf;

/// Top-level error type for FormCoach operations.
///
/// Per-frame failures (`Extraction`) are recovered by the caller; only
/// whole-session failures such as `NoPoseDetected` are meant to reach
/// the result consumer.
#[derive(Debug, thiserror::Error)]
pub enum FormcoachError {
    #[error("Feature extraction failed: {message}")]
    Extraction { message: String },

    #[error("No pose landmarks detected in video")]
    NoPoseDetected,

    #[error("Frame source error: {message}")]
    FrameSource { message: String },

    #[error("Coaching error: {message}")]
    Coaching { message: String },

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

/// Result type alias using FormcoachError.
pub type FormcoachResult<T> = Result<T, FormcoachError>;

impl FormcoachError {
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction {
            message: msg.into(),
        }
    }

    pub fn frame_source(msg: impl Into<String>) -> Self {
        Self::FrameSource {
            message: msg.into(),
        }
    }

    pub fn coaching(msg: impl Into<String>) -> Self {
        Self::Coaching {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether this error only affects a single frame and the session may continue.
    pub fn is_frame_local(&self) -> bool {
        matches!(self, Self::Extraction { .. })
    }
}
