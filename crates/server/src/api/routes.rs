use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::middleware::metrics_middleware;
use super::{handlers, pipeline};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let storage = &state.config().storage;
    let artifacts = ServeDir::new(&storage.root_dir);
    let mount = storage.mount_path.trim_matches('/').to_string();

    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Pipeline
        .route("/pipeline/trigger", post(pipeline::trigger))
        .route("/pipeline/status", get(pipeline::get_status));

    let router = Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state);

    // Published locators resolve against the artifact root
    let router = if mount.is_empty() {
        router.fallback_service(artifacts)
    } else {
        router.nest_service(&format!("/{}", mount), artifacts)
    };

    router
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
