//! Mock image provider for testing.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::fixtures::PNG_BYTES;
use crate::generation::{GenerationError, GenerationRequest, ImageProvider};
use crate::storage::ArtifactSource;

/// Mock implementation of the ImageProvider trait.
///
/// Returns a tiny PNG as base64 unless configured otherwise. Every request
/// is recorded, including the ones that fail.
pub struct MockImageProvider {
    name: String,
    /// Recorded generation requests.
    requests: Arc<RwLock<Vec<GenerationRequest>>>,
    /// If set, the next generation will fail with this error.
    next_error: Arc<RwLock<Option<GenerationError>>>,
    /// Source returned on success.
    response: Arc<RwLock<ArtifactSource>>,
    /// Simulated provider latency.
    delay: Arc<RwLock<Option<Duration>>>,
}

impl Default for MockImageProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockImageProvider {
    pub fn new() -> Self {
        Self::named("mock")
    }

    /// Mock that reports `name` as its provider name.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            requests: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            response: Arc::new(RwLock::new(ArtifactSource::Base64(STANDARD.encode(PNG_BYTES)))),
            delay: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn recorded_requests(&self) -> Vec<GenerationRequest> {
        self.requests.read().await.clone()
    }

    /// Configure the next generation to fail with the given error.
    pub async fn set_next_error(&self, error: GenerationError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn set_response(&self, source: ArtifactSource) {
        *self.response.write().await = source;
    }

    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }
}

#[async_trait]
impl ImageProvider for MockImageProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<ArtifactSource, GenerationError> {
        self.requests.write().await.push(request.clone());

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        Ok(self.response.read().await.clone())
    }
}
