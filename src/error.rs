//! Error types for VidSage.

use thiserror::Error;

/// Library-level error type for VidSage operations.
#[derive(Error, Debug)]
pub enum VidsageError {
    #[error("No content to index: input text is empty")]
    EmptyInput,

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Unsupported embedding provider: {0}")]
    UnsupportedProvider(String),

    #[error("Video not ingested: {0}")]
    NotIngested(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Cannot build an index with zero chunks")]
    EmptyIndex,

    #[error("Transcript unavailable for {video_id}: {reason}")]
    TranscriptUnavailable { video_id: String, reason: String },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// User-visible failure category.
///
/// Ingest and query failures must stay distinguishable end-to-end, so every
/// error collapses into exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The transcript could not be fetched.
    TranscriptUnavailable,
    /// The video was queried before it was ingested.
    NotIngested,
    /// Anything else: indexing, embedding, or generation failures.
    Internal,
}

impl VidsageError {
    /// The user-visible category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            VidsageError::TranscriptUnavailable { .. } => ErrorCategory::TranscriptUnavailable,
            VidsageError::NotIngested(_) => ErrorCategory::NotIngested,
            _ => ErrorCategory::Internal,
        }
    }

    /// Wrap a backend failure.
    pub fn backend(err: impl std::fmt::Display) -> Self {
        VidsageError::Backend(err.to_string())
    }
}

/// Result type alias for VidSage operations.
pub type Result<T> = std::result::Result<T, VidsageError>;
