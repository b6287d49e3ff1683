//! Provider adapter trait.

use async_trait::async_trait;

use super::error::GenerationError;
use super::types::GenerationRequest;
use crate::storage::ArtifactSource;

/// A generation backend speaking one provider's wire protocol.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Provider name (e.g. "openrouter", "openai").
    fn name(&self) -> &str;

    /// Generate one image. Credentials are checked before any network call.
    async fn generate(&self, request: &GenerationRequest)
        -> Result<ArtifactSource, GenerationError>;
}
