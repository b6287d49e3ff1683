//! Trait definition for artifact stores.

use async_trait::async_trait;

use super::error::ArtifactError;
use super::types::{Artifact, ArtifactSource};
use crate::generation::GenerationRequest;

/// Durable storage for generated images.
///
/// An artifact is fully written before it is returned, so its locator can be
/// published as soon as `materialize` resolves.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Returns the name of this store implementation.
    fn name(&self) -> &str;

    /// Persist a provider output along with a metadata sidecar.
    async fn materialize(
        &self,
        source: ArtifactSource,
        request: &GenerationRequest,
    ) -> Result<Artifact, ArtifactError>;

    /// Persist one cell of a grid as `<base_name>_<index>.png`, no sidecar.
    async fn materialize_cell(
        &self,
        source: ArtifactSource,
        base_name: &str,
        index: usize,
    ) -> Result<Artifact, ArtifactError>;
}
