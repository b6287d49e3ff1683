//! Artifact store: turns provider output into files with stable locators.

mod error;
mod fs_store;
pub mod naming;
mod traits;
mod types;

pub use error::ArtifactError;
pub use fs_store::FsArtifactStore;
pub use traits::ArtifactStore;
pub use types::{Artifact, ArtifactMetadata, ArtifactSource};
