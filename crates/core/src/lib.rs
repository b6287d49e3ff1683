pub mod config;
pub mod content;
pub mod generation;
pub mod metrics;
pub mod orchestrator;
pub mod storage;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, RepositoryBackend,
    SanitizedConfig,
};
pub use content::{
    AirtableRepository, AspectRatio, ContentRepository, ContentRequest, ContentStatus,
    ContentUpdate, NewContentRequest, Quality, RepositoryError, SqliteContentRepository,
    StatusCounts,
};
pub use generation::{
    GenerationDispatcher, GenerationError, GenerationRequest, ImageProvider, OpenAiProvider,
    OpenRouterProvider, RoutePredicate,
};
pub use orchestrator::{
    ContentOrchestrator, ItemOutcome, ItemReport, OrchestratorConfig, OrchestratorError,
    PipelineStatus, SweepOutcome, SweepReport,
};
pub use storage::{Artifact, ArtifactError, ArtifactSource, ArtifactStore, FsArtifactStore};
