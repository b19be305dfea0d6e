//! Error types for the InfraLens classification pipeline.
//!
//! Errors are organized by stage to provide clear, actionable error messages
//! that include relevant context (file paths, stage names, specific issues).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for InfraLens operations.
#[derive(Error, Debug)]
pub enum InfraLensError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised while turning an image into a [`Decision`](crate::Decision).
///
/// The classifier itself only ever produces `OracleUnavailable` and
/// `ScoreShape`; `Oracle` carries failures raised inside the oracle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    /// The similarity oracle is not initialized or cannot be invoked.
    #[error("Similarity oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// The oracle failed while scoring an image.
    #[error("Similarity oracle failed: {0}")]
    Oracle(String),

    /// The oracle returned a probability vector of the wrong length.
    #[error("Oracle returned {actual} probabilities for {expected} labels")]
    ScoreShape { expected: usize, actual: usize },
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Model loading or inference failed outside a specific image
    #[error("Model error: {message}")]
    Model { message: String },

    /// Classification failed
    #[error("Classification failed for {path}: {source}")]
    Classify {
        path: PathBuf,
        #[source]
        source: ClassifyError,
    },

    /// Operation timed out
    #[error("Timeout in {stage} stage for {path} after {timeout_ms}ms")]
    Timeout {
        path: PathBuf,
        stage: String,
        timeout_ms: u64,
    },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Unsupported image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

impl PipelineError {
    /// True when the failure means no image in the run can be classified.
    pub fn is_oracle_unavailable(&self) -> bool {
        matches!(
            self,
            PipelineError::Classify {
                source: ClassifyError::OracleUnavailable(_),
                ..
            }
        )
    }
}

/// Convenience type alias for InfraLens results.
pub type Result<T> = std::result::Result<T, InfraLensError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
