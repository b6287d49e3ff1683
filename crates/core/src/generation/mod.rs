//! Image generation: provider adapters and the dispatcher that routes to them.
//!
//! A [`GenerationRequest`] is routed by its resolved model id to one
//! [`ImageProvider`]; the provider's [`ArtifactSource`](crate::storage::ArtifactSource)
//! is handed to an artifact store and the finished artifact is returned.

mod dispatcher;
mod error;
mod models;
mod openai;
mod openrouter;
mod references;
mod traits;
mod types;

pub use dispatcher::{GenerationDispatcher, RoutePredicate};
pub use error::GenerationError;
pub use models::{resolve_model, MODEL_ALIASES};
pub use openai::{image_size, OpenAiProvider};
pub use openrouter::{quality_knobs, OpenRouterProvider, QualityKnobs};
pub use references::ReferenceFetcher;
pub use traits::ImageProvider;
pub use types::GenerationRequest;
