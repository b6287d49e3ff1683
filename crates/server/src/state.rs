use std::sync::Arc;
use lumiere_core::{Config, ContentOrchestrator, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: Arc<ContentOrchestrator>,
}

impl AppState {
    pub fn new(config: Config, orchestrator: Arc<ContentOrchestrator>) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn orchestrator(&self) -> &Arc<ContentOrchestrator> {
        &self.orchestrator
    }

    /// Whether the interval scheduler is configured to run.
    pub fn scheduler_enabled(&self) -> bool {
        self.config.orchestrator.enabled
    }
}
