//! Generation dispatcher: picks an adapter and persists its output.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::error::GenerationError;
use super::openai::OpenAiProvider;
use super::openrouter::OpenRouterProvider;
use super::traits::ImageProvider;
use super::types::GenerationRequest;
use crate::config::ProvidersConfig;
use crate::metrics;
use crate::storage::{Artifact, ArtifactStore};

/// Condition on a resolved model id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePredicate {
    /// Model id contains this text (ASCII case-insensitive).
    Contains(String),
    /// Matches every model.
    Any,
}

impl RoutePredicate {
    pub fn contains(needle: impl Into<String>) -> Self {
        Self::Contains(needle.into().to_ascii_lowercase())
    }

    pub fn matches(&self, model: &str) -> bool {
        match self {
            Self::Contains(needle) => model.to_ascii_lowercase().contains(needle.as_str()),
            Self::Any => true,
        }
    }
}

struct Route {
    predicate: RoutePredicate,
    provider: Arc<dyn ImageProvider>,
}

/// Routes requests to providers by an ordered rule list; the first matching
/// rule wins. Failures are returned unchanged and never retried here.
pub struct GenerationDispatcher {
    routes: Vec<Route>,
    store: Arc<dyn ArtifactStore>,
}

impl GenerationDispatcher {
    /// Dispatcher with no routes.
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            routes: Vec::new(),
            store,
        }
    }

    /// Append a rule. Rules are tried in insertion order.
    pub fn route(mut self, predicate: RoutePredicate, provider: Arc<dyn ImageProvider>) -> Self {
        self.routes.push(Route {
            predicate,
            provider,
        });
        self
    }

    /// Standard routing: `gpt-image` models go to OpenAI, the rest to OpenRouter.
    pub fn from_config(
        config: &ProvidersConfig,
        store: Arc<dyn ArtifactStore>,
    ) -> Result<Self, GenerationError> {
        let openai = OpenAiProvider::new(&config.openai)?;
        let openrouter = OpenRouterProvider::new(
            &config.openrouter,
            Duration::from_secs(config.reference_timeout_secs),
        )?;

        Ok(Self::new(store)
            .route(RoutePredicate::contains("gpt-image"), Arc::new(openai))
            .route(RoutePredicate::Any, Arc::new(openrouter)))
    }

    /// Adapter that would handle `model`.
    pub fn select(&self, model: &str) -> Result<&Arc<dyn ImageProvider>, GenerationError> {
        self.routes
            .iter()
            .find(|route| route.predicate.matches(model))
            .map(|route| &route.provider)
            .ok_or_else(|| GenerationError::UnroutableModel(model.to_string()))
    }

    /// Generate one image and persist it.
    pub async fn dispatch(&self, request: &GenerationRequest) -> Result<Artifact, GenerationError> {
        let provider = self.select(&request.model)?;
        let provider_name = provider.name().to_string();

        info!(
            "Generating with {}: model={}, aspect={}, quality={}",
            provider_name, request.model, request.aspect_ratio, request.quality
        );

        let timer = metrics::GENERATION_DURATION
            .with_label_values(&[provider_name.as_str()])
            .start_timer();

        let result = async {
            let source = provider.generate(request).await?;
            debug!("{} returned a {} source", provider_name, source.kind());
            Ok::<_, GenerationError>(self.store.materialize(source, request).await?)
        }
        .await;

        timer.observe_duration();

        let outcome = if result.is_ok() { "success" } else { "failed" };
        metrics::GENERATIONS
            .with_label_values(&[provider_name.as_str(), outcome])
            .inc();

        if let Err(ref e) = result {
            warn!("Generation with {} failed: {}", provider_name, e);
        }

        result
    }
}
