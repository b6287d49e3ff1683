//! Content repository trait and error type.

use async_trait::async_trait;
use thiserror::Error;

use super::{ContentRequest, ContentStatus, ContentUpdate, StatusCounts};

/// Errors raised by a content repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Backend could not be reached or refused the connection.
    #[error("Repository unavailable: {0}")]
    Unavailable(String),

    /// Backend answered with a non-success status.
    #[error("Repository API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Content not found: {0}")]
    NotFound(String),

    /// The requested status change is not part of the lifecycle.
    #[error("Invalid transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: ContentStatus,
        to: ContentStatus,
    },

    #[error("Database error: {0}")]
    Database(String),

    /// Backend returned a payload that could not be interpreted.
    #[error("Failed to parse repository response: {0}")]
    Parse(String),
}

/// Persistent list of content requests and their lifecycle status.
///
/// Implementations own record identifiers and field encoding. Callers only
/// see [`ContentRequest`] values and the status names of [`ContentStatus`].
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Short backend name, used in logs and metrics.
    fn name(&self) -> &str;

    /// Records in `status`, ordered by scheduled date ascending.
    async fn list(&self, status: ContentStatus) -> Result<Vec<ContentRequest>, RepositoryError>;

    /// Change a record's status and write the accompanying fields.
    async fn update(
        &self,
        id: &str,
        status: ContentStatus,
        fields: ContentUpdate,
    ) -> Result<(), RepositoryError>;

    /// Mark a record as failed and preserve the error text.
    async fn set_error(&self, id: &str, message: &str) -> Result<(), RepositoryError> {
        self.update(id, ContentStatus::Failed, ContentUpdate::error(message))
            .await
    }

    /// Attach a generated artifact and move the record to review.
    async fn set_result(
        &self,
        id: &str,
        image_url: &str,
        local_image_path: &str,
    ) -> Result<(), RepositoryError> {
        self.update(
            id,
            ContentStatus::Review,
            ContentUpdate::result(image_url, local_image_path),
        )
        .await
    }

    /// Number of records per status name. Records without a status count
    /// under `"unknown"`.
    async fn status_counts(&self) -> Result<StatusCounts, RepositoryError>;
}
