use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lumiere_core::{
    load_config, validate_config, AirtableRepository, Config, ContentOrchestrator,
    ContentRepository, FsArtifactStore, GenerationDispatcher, RepositoryBackend,
    SqliteContentRepository,
};
use lumiere_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("LUMIERE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Repository backend: {:?}", config.repository.backend);
    info!("Artifact root: {:?}", config.storage.root_dir);

    let repository = create_repository(&config)?;
    info!("Content repository initialized ({})", repository.name());

    let store = FsArtifactStore::new(&config.storage).context("Failed to create artifact store")?;
    std::fs::create_dir_all(store.output_path())
        .with_context(|| format!("Failed to create {:?}", store.output_path()))?;

    let dispatcher = GenerationDispatcher::from_config(&config.providers, Arc::new(store))
        .context("Failed to create generation dispatcher")?;

    let orchestrator = Arc::new(ContentOrchestrator::new(
        config.orchestrator.clone(),
        repository,
        Arc::new(dispatcher),
    ));

    if config.orchestrator.enabled {
        orchestrator.start().await;
        info!("Content orchestrator started");
    } else {
        info!("Scheduler disabled in config, sweeps run on trigger only");
    }

    let state = Arc::new(AppState::new(config.clone(), Arc::clone(&orchestrator)));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    if orchestrator.is_running() {
        orchestrator.stop().await;
        info!("Content orchestrator stopped");
    }

    Ok(())
}

fn create_repository(config: &Config) -> Result<Arc<dyn ContentRepository>> {
    let repository: Arc<dyn ContentRepository> = match config.repository.backend {
        RepositoryBackend::Airtable => Arc::new(
            AirtableRepository::new(&config.repository.airtable)
                .context("Failed to create Airtable repository")?,
        ),
        RepositoryBackend::Sqlite => Arc::new(
            SqliteContentRepository::new(&config.repository.sqlite.path)
                .context("Failed to open SQLite repository")?,
        ),
    };
    Ok(repository)
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
