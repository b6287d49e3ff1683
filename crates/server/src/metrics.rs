//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the lumiere server:
//! - HTTP request metrics (latency, counts, in flight)
//! - Pipeline state (collected dynamically on scrape)
//! - Core sweep, generation and storage counters (registered from `lumiere_core`)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use regex_lite::Regex;
use tracing::{error, warn};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "lumiere_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        // Trigger requests block for a whole sweep
        .buckets(vec![
            0.005, 0.025, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0, 600.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("lumiere_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "lumiere_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Pipeline Metrics (collected dynamically)
// =============================================================================

/// 1 while a sweep is executing.
pub static SWEEP_IN_PROGRESS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "lumiere_sweep_in_progress",
        "Whether a pipeline sweep is executing (1) or idle (0)",
    )
    .unwrap()
});

pub static SCHEDULER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "lumiere_scheduler_running",
        "Whether the sweep scheduler is running (1) or stopped (0)",
    )
    .unwrap()
});

/// Content records by status, as reported by the repository.
pub static CONTENT_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("lumiere_content_by_status", "Content records by status"),
        &["status"],
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    let server_metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // HTTP
        Box::new(HTTP_REQUEST_DURATION.clone()),
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()),
        // Pipeline
        Box::new(SWEEP_IN_PROGRESS.clone()),
        Box::new(SCHEDULER_RUNNING.clone()),
        Box::new(CONTENT_BY_STATUS.clone()),
    ];

    // Core metrics (sweeps, generations, storage)
    for metric in server_metrics
        .into_iter()
        .chain(lumiere_core::metrics::all_metrics())
    {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Refresh gauges from current application state before a scrape.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let orchestrator = state.orchestrator();
    SWEEP_IN_PROGRESS.set(i64::from(orchestrator.is_sweeping()));
    SCHEDULER_RUNNING.set(i64::from(orchestrator.is_running()));

    match orchestrator.status().await {
        Ok(status) => {
            CONTENT_BY_STATUS.reset();
            for (status, count) in &status.status_counts {
                CONTENT_BY_STATUS
                    .with_label_values(&[status.as_str()])
                    .set(*count as i64);
            }
        }
        // Keep the last known counts
        Err(e) => warn!("Could not refresh content counts: {}", e),
    }
}

static ARTIFACT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\d{8}_\d{6}_[^/]+$").unwrap());
static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .unwrap()
});

/// Normalize a path for metric labels (replace artifact names and ids with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = ARTIFACT_NAME.replace(path, "/{artifact}");
    UUID.replace_all(&result, "{id}").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_artifact() {
        let path = "/beta/to-be-processed/20260301_091500_flux_a-red-fox-in-snow.png";
        assert_eq!(normalize_path(path), "/beta/to-be-processed/{artifact}");
    }

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/v1/content/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(normalize_path(path), "/api/v1/content/{id}");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        assert_eq!(normalize_path("/api/v1/health"), "/api/v1/health");
        assert_eq!(
            normalize_path("/api/v1/pipeline/trigger"),
            "/api/v1/pipeline/trigger"
        );
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("lumiere_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_pipeline_metrics() {
        // Vec metrics only appear once a label set has been touched
        SWEEP_IN_PROGRESS.set(0);
        SCHEDULER_RUNNING.set(0);
        CONTENT_BY_STATUS.with_label_values(&["pending"]).set(0);
        lumiere_core::metrics::SWEEPS
            .with_label_values(&["completed"])
            .inc_by(0);
        lumiere_core::metrics::ARTIFACTS_WRITTEN.inc_by(0);

        let output = encode_metrics();

        assert!(output.contains("lumiere_sweep_in_progress"));
        assert!(output.contains("lumiere_scheduler_running"));
        assert!(output.contains("lumiere_content_by_status"));
        assert!(output.contains("lumiere_sweeps_total"));
        assert!(output.contains("lumiere_artifacts_written_total"));
    }
}
