//! Error type for generation.

use thiserror::Error;

use crate::storage::ArtifactError;

/// Errors returned by provider adapters and the dispatcher.
///
/// The display text is what ends up in a failed record's error field.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Request cannot be sent to any provider (e.g. empty prompt).
    #[error("Invalid generation request: {0}")]
    InvalidRequest(String),

    /// Provider credentials are absent; no network call was made.
    #[error("{variable} not set")]
    MissingCredentials { provider: String, variable: String },

    /// Provider answered with a non-success status.
    #[error("{provider} API error ({status}): {body}")]
    Http {
        provider: String,
        status: u16,
        body: String,
    },

    /// Provider could not be reached or the reply could not be read.
    #[error("{provider} request failed: {message}")]
    Transport { provider: String, message: String },

    /// Well-formed reply without a usable image.
    #[error("No image in {provider} response")]
    NoImageInResponse { provider: String },

    #[error("No provider route for model {0}")]
    UnroutableModel(String),

    /// Provider succeeded but the artifact could not be persisted.
    #[error("Storage error: {0}")]
    Storage(#[from] ArtifactError),
}

impl GenerationError {
    pub fn missing_credentials(provider: &str, variable: &str) -> Self {
        Self::MissingCredentials {
            provider: provider.to_string(),
            variable: variable.to_string(),
        }
    }

    pub fn transport(provider: &str, message: impl ToString) -> Self {
        Self::Transport {
            provider: provider.to_string(),
            message: message.to_string(),
        }
    }

    pub fn no_image(provider: &str) -> Self {
        Self::NoImageInResponse {
            provider: provider.to_string(),
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::MissingCredentials { .. } => "missing_credentials",
            Self::Http { .. } | Self::Transport { .. } => "provider_error",
            Self::NoImageInResponse { .. } => "no_image",
            Self::UnroutableModel(_) => "unroutable",
            Self::Storage(_) => "storage",
        }
    }
}
