//! Upload error types

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias using UploadError
pub type Result<T> = std::result::Result<T, UploadError>;

/// Errors raised while uploading a single part of an asset
#[derive(Debug, Error)]
pub enum UploadError {
    /// The operation has no offset or length, so no bytes can be selected
    #[error("could not establish bounds of upload operation")]
    MissingChunkBounds,

    /// The operation has no method or URL, so no request can be built
    #[error("could not establish destination of upload operation")]
    MissingUploadDestination,

    /// Method, URL or a header could not be turned into a valid request
    #[error("invalid upload request: {0}")]
    InvalidRequest(String),

    /// Seeking or reading the source asset failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network-level failure executing the request
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The destination answered outside the 2xx range
    #[error("upload failed with status {status}: {body}")]
    Rejected { status: StatusCode, body: String },

    /// The caller cancelled the upload
    #[error("upload cancelled")]
    Cancelled,

    /// The upload deadline expired before this part finished
    #[error("upload deadline exceeded")]
    TimedOut,

    /// The task driving this part panicked or was aborted
    #[error("upload task failed: {0}")]
    TaskFailed(String),

    /// The uploader was given a configuration it cannot run with
    #[error("invalid upload configuration: {0}")]
    Config(#[from] ConfigError),
}

impl UploadError {
    /// Whether the caller cancelled this part
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether the upload deadline stopped this part
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut)
    }

    /// HTTP status of a rejected part, if any
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Http(e) => e.status(),
            _ => None,
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Failed to read the configuration file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A value failed validation
    #[error("Invalid value for {field}: {message}")]
    Invalid { field: String, message: String },
}
