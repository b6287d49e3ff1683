//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Orchestrator (sweeps, repository failures)
//! - Generation (per-provider outcomes and latency, reference downloads)
//! - Storage (artifacts written)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Orchestrator
// =============================================================================

/// Sweeps by result.
pub static SWEEPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("lumiere_sweeps_total", "Total pipeline sweeps"),
        &["result"], // "completed", "skipped", "aborted"
    )
    .unwrap()
});

/// Wall time of completed sweeps.
pub static SWEEP_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "lumiere_sweep_duration_seconds",
            "Duration of pipeline sweeps",
        )
        .buckets(vec![0.1, 1.0, 5.0, 15.0, 30.0, 60.0, 180.0, 600.0, 1800.0]),
        &[],
    )
    .unwrap()
});

/// Repository calls that failed, by operation.
pub static REPOSITORY_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "lumiere_repository_errors_total",
            "Content repository operations that failed",
        ),
        &["operation"], // "list", "update", "set_result", "set_error", "status_counts"
    )
    .unwrap()
});

// =============================================================================
// Generation
// =============================================================================

/// Generations by provider and result.
pub static GENERATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("lumiere_generations_total", "Total image generations"),
        &["provider", "result"], // result: "success", "failed"
    )
    .unwrap()
});

/// Generation latency, including artifact persistence.
pub static GENERATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "lumiere_generation_duration_seconds",
            "Duration of image generation per provider",
        )
        .buckets(vec![1.0, 5.0, 10.0, 20.0, 30.0, 60.0, 90.0, 120.0, 180.0]),
        &["provider"],
    )
    .unwrap()
});

/// Reference images that could not be downloaded and were dropped.
pub static REFERENCE_FETCH_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "lumiere_reference_fetch_failures_total",
        "Reference images dropped because they could not be fetched",
    )
    .unwrap()
});

// =============================================================================
// Storage
// =============================================================================

/// Artifacts written to storage.
pub static ARTIFACTS_WRITTEN: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "lumiere_artifacts_written_total",
        "Artifacts written to storage",
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Orchestrator
        Box::new(SWEEPS.clone()),
        Box::new(SWEEP_DURATION.clone()),
        Box::new(REPOSITORY_ERRORS.clone()),
        // Generation
        Box::new(GENERATIONS.clone()),
        Box::new(GENERATION_DURATION.clone()),
        Box::new(REFERENCE_FETCH_FAILURES.clone()),
        // Storage
        Box::new(ARTIFACTS_WRITTEN.clone()),
    ]
}
