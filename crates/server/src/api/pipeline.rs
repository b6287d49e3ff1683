//! Pipeline API endpoints: manual sweep trigger and status.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use lumiere_core::{PipelineStatus, SweepOutcome};

use crate::state::AppState;

/// Response for the trigger endpoint.
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    /// False when another sweep was already running.
    pub ran: bool,
    #[serde(flatten)]
    pub outcome: SweepOutcome,
}

/// Response for the status endpoint.
#[derive(Debug, Serialize)]
pub struct PipelineStatusResponse {
    #[serde(flatten)]
    pub status: PipelineStatus,
    pub scheduler_enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Run a sweep now and wait for it to finish.
///
/// The sweep runs in its own task, so a client that disconnects early does
/// not cut an item short.
///
/// POST /api/v1/pipeline/trigger
pub async fn trigger(State(state): State<Arc<AppState>>) -> Response {
    info!("Manual sweep requested");
    let orchestrator = Arc::clone(state.orchestrator());
    let outcome = match tokio::spawn(async move { orchestrator.run_sweep().await }).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Sweep task failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response();
        }
    };

    let status = match outcome {
        SweepOutcome::Aborted { .. } => StatusCode::SERVICE_UNAVAILABLE,
        SweepOutcome::Skipped | SweepOutcome::Completed(_) => StatusCode::OK,
    };

    (
        status,
        Json(TriggerResponse {
            ran: outcome.ran(),
            outcome,
        }),
    )
        .into_response()
}

/// GET /api/v1/pipeline/status
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PipelineStatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    let status = state.orchestrator().status().await.map_err(|e| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })?;

    Ok(Json(PipelineStatusResponse {
        status,
        scheduler_enabled: state.scheduler_enabled(),
    }))
}
