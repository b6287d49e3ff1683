//! Error types for the artifact store.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while materializing an artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Inline payload was not valid base64 or not a supported data URI.
    #[error("Failed to decode image payload: {0}")]
    Decode(String),

    /// Source decoded or downloaded to zero bytes.
    #[error("Image payload is empty")]
    EmptyPayload,

    /// Remote source could not be downloaded.
    #[error("Failed to fetch image from {url}: {message}")]
    Fetch { url: String, message: String },

    /// Failed to create or write the artifact file.
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the sidecar metadata record.
    #[error("Failed to write metadata: {0}")]
    Metadata(String),

    /// HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl ArtifactError {
    pub(crate) fn write(path: PathBuf, source: std::io::Error) -> Self {
        Self::Write { path, source }
    }
}
