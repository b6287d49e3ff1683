//! Content orchestrator implementation.
//!
//! A sweep lists every pending record and drives each one through
//! `Pending -> InProgress -> Review | Failed`, one record at a time.
//! Sweeps are single-flight: a sweep requested while another is running
//! returns immediately without touching any record.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, warn};

use crate::content::{ContentRepository, ContentRequest, ContentStatus, ContentUpdate};
use crate::generation::{GenerationDispatcher, GenerationRequest};
use crate::metrics;

use super::config::OrchestratorConfig;
use super::types::{
    ItemOutcome, ItemReport, OrchestratorError, PipelineStatus, SweepOutcome, SweepReport,
};

/// Holds the single-flight flag for the duration of a sweep.
///
/// Released on drop, so a sweep that panics or is cancelled does not leave
/// the pipeline locked.
struct SweepGuard {
    flag: Arc<AtomicBool>,
}

impl SweepGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for SweepGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// The content orchestrator - moves pending records through generation.
pub struct ContentOrchestrator {
    config: OrchestratorConfig,
    repository: Arc<dyn ContentRepository>,
    dispatcher: Arc<GenerationDispatcher>,

    // Runtime state
    sweeping: Arc<AtomicBool>,
    last_sweep_at: Arc<RwLock<Option<DateTime<Utc>>>>,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ContentOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        repository: Arc<dyn ContentRepository>,
        dispatcher: Arc<GenerationDispatcher>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            repository,
            dispatcher,
            sweeping: Arc::new(AtomicBool::new(false)),
            last_sweep_at: Arc::new(RwLock::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Run one sweep now, unless one is already in progress.
    pub async fn run_sweep(&self) -> SweepOutcome {
        Self::sweep(
            &self.repository,
            &self.dispatcher,
            &self.sweeping,
            &self.last_sweep_at,
        )
        .await
    }

    /// Whether a sweep is executing right now.
    pub fn is_sweeping(&self) -> bool {
        self.sweeping.load(Ordering::Acquire)
    }

    /// Whether the interval scheduler is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Current record counts and sweep state.
    pub async fn status(&self) -> Result<PipelineStatus, OrchestratorError> {
        let status_counts = self.repository.status_counts().await.map_err(|e| {
            metrics::REPOSITORY_ERRORS
                .with_label_values(&["status_counts"])
                .inc();
            e
        })?;

        Ok(PipelineStatus {
            total: status_counts.values().sum(),
            status_counts,
            sweep_in_progress: self.is_sweeping(),
            last_sweep_at: *self.last_sweep_at.read().await,
            scheduler_running: self.is_running(),
        })
    }

    /// Start the interval scheduler (spawns a background task).
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Orchestrator already running");
            return;
        }

        info!(
            "Starting content orchestrator (every {}s)",
            self.config.sweep_interval_secs
        );
        self.spawn_sweep_loop();
    }

    /// Stop the interval scheduler. A sweep already executing runs to completion.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Orchestrator not running");
            return;
        }

        info!("Stopping content orchestrator");
        let _ = self.shutdown_tx.send(());
    }

    fn spawn_sweep_loop(&self) {
        let running = Arc::clone(&self.running);
        let repository = Arc::clone(&self.repository);
        let dispatcher = Arc::clone(&self.dispatcher);
        let sweeping = Arc::clone(&self.sweeping);
        let last_sweep_at = Arc::clone(&self.last_sweep_at);
        let config = self.config.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Sweep loop started");

            if config.run_on_startup {
                Self::sweep(&repository, &dispatcher, &sweeping, &last_sweep_at).await;
            }

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Sweep loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(Duration::from_secs(config.sweep_interval_secs)) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        Self::sweep(&repository, &dispatcher, &sweeping, &last_sweep_at).await;
                    }
                }
            }
            info!("Sweep loop stopped");
        });
    }

    async fn sweep(
        repository: &Arc<dyn ContentRepository>,
        dispatcher: &Arc<GenerationDispatcher>,
        sweeping: &Arc<AtomicBool>,
        last_sweep_at: &Arc<RwLock<Option<DateTime<Utc>>>>,
    ) -> SweepOutcome {
        let Some(_guard) = SweepGuard::acquire(sweeping) else {
            warn!("Sweep already running, skipping");
            metrics::SWEEPS.with_label_values(&["skipped"]).inc();
            return SweepOutcome::Skipped;
        };

        let timer = metrics::SWEEP_DURATION.with_label_values(&[]).start_timer();
        let started_at = Utc::now();
        info!("Starting sweep against {}", repository.name());

        let pending = match repository.list(ContentStatus::Pending).await {
            Ok(items) => items,
            Err(e) => {
                metrics::REPOSITORY_ERRORS.with_label_values(&["list"]).inc();
                metrics::SWEEPS.with_label_values(&["aborted"]).inc();
                error!("Failed to list pending content: {}", e);
                *last_sweep_at.write().await = Some(started_at);
                return SweepOutcome::Aborted {
                    error: e.to_string(),
                };
            }
        };

        info!("Found {} pending items", pending.len());

        let mut items = Vec::with_capacity(pending.len());
        for item in pending {
            let id = item.id.clone();
            let outcome = Self::process_item(repository, dispatcher, item).await;
            items.push(ItemReport { id, outcome });
        }

        let report = SweepReport {
            started_at,
            finished_at: Utc::now(),
            items,
        };
        *last_sweep_at.write().await = Some(report.finished_at);
        timer.observe_duration();
        metrics::SWEEPS.with_label_values(&["completed"]).inc();

        info!(
            "Sweep finished: {} generated, {} failed, {} store errors",
            report.generated(),
            report.failed(),
            report.store_errors()
        );

        SweepOutcome::Completed(report)
    }

    /// Drive one record to `Review` or `Failed`.
    ///
    /// A repository failure ends this item; the sweep moves on.
    async fn process_item(
        repository: &Arc<dyn ContentRepository>,
        dispatcher: &GenerationDispatcher,
        item: ContentRequest,
    ) -> ItemOutcome {
        let id = item.id.as_str();
        let title = if item.title.is_empty() {
            id
        } else {
            item.title.as_str()
        };

        if let Err(e) = Self::claim(repository, &item).await {
            error!("Could not claim {}: {}", id, e);
            return ItemOutcome::StoreError {
                error: e.to_string(),
            };
        }
        info!("Generating {} ({})", title, item.model);

        let generated = match GenerationRequest::from_content(&item) {
            Ok(request) => dispatcher.dispatch(&request).await,
            Err(e) => Err(e),
        };

        match generated {
            Ok(artifact) => {
                let local_path = artifact.path.display().to_string();
                let written = Self::record(
                    repository,
                    id,
                    ContentStatus::Review,
                    ContentUpdate::result(&artifact.locator, &local_path),
                    "set_result",
                )
                .await;

                match written {
                    Ok(()) => {
                        info!("{} ready for review: {}", title, artifact.locator);
                        ItemOutcome::Generated {
                            locator: artifact.locator,
                            local_path,
                        }
                    }
                    Err(e) => {
                        error!(
                            "Generated {} but could not record it: {}",
                            artifact.relative_path, e
                        );
                        ItemOutcome::StoreError {
                            error: e.to_string(),
                        }
                    }
                }
            }
            Err(generation_error) => {
                let message = generation_error.to_string();
                error!("Generation failed for {}: {}", title, message);

                match Self::record(
                    repository,
                    id,
                    ContentStatus::Failed,
                    ContentUpdate::error(&message),
                    "set_error",
                )
                .await
                {
                    Ok(()) => ItemOutcome::Failed { error: message },
                    Err(e) => {
                        error!("Could not record failure for {}: {}", id, e);
                        ItemOutcome::StoreError {
                            error: e.to_string(),
                        }
                    }
                }
            }
        }
    }

    async fn claim(
        repository: &Arc<dyn ContentRepository>,
        item: &ContentRequest,
    ) -> Result<(), OrchestratorError> {
        Self::ensure_transition(&item.id, item.status, ContentStatus::InProgress)?;
        repository
            .update(&item.id, ContentStatus::InProgress, ContentUpdate::StatusOnly)
            .await
            .map_err(|e| {
                metrics::REPOSITORY_ERRORS.with_label_values(&["update"]).inc();
                OrchestratorError::from(e)
            })
    }

    /// Write a terminal outcome for a claimed record.
    async fn record(
        repository: &Arc<dyn ContentRepository>,
        id: &str,
        status: ContentStatus,
        fields: ContentUpdate,
        operation: &str,
    ) -> Result<(), OrchestratorError> {
        Self::ensure_transition(id, ContentStatus::InProgress, status)?;

        let result = match fields {
            ContentUpdate::Result {
                image_url,
                local_image_path,
            } => {
                repository
                    .set_result(id, &image_url, &local_image_path)
                    .await
            }
            ContentUpdate::Error { message } => repository.set_error(id, &message).await,
            ContentUpdate::StatusOnly => repository.update(id, status, fields).await,
        };

        result.map_err(|e| {
            metrics::REPOSITORY_ERRORS
                .with_label_values(&[operation])
                .inc();
            OrchestratorError::from(e)
        })
    }

    fn ensure_transition(
        id: &str,
        from: ContentStatus,
        to: ContentStatus,
    ) -> Result<(), OrchestratorError> {
        if from.can_transition_to(to) {
            debug!("{}: {} -> {}", id, from, to);
            Ok(())
        } else {
            Err(OrchestratorError::InvalidTransition {
                id: id.to_string(),
                from,
                to,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::content::RepositoryError;
    use crate::generation::{GenerationError, RoutePredicate};
    use crate::storage::FsArtifactStore;
    use crate::testing::fixtures::content_request;
    use crate::testing::{MockContentRepository, MockImageProvider};
    use tempfile::TempDir;

    struct Harness {
        orchestrator: Arc<ContentOrchestrator>,
        repository: Arc<MockContentRepository>,
        provider: Arc<MockImageProvider>,
        _dir: TempDir,
    }

    fn harness(items: Vec<ContentRequest>) -> Harness {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(&StorageConfig {
            root_dir: dir.path().to_path_buf(),
            ..StorageConfig::default()
        })
        .unwrap();

        let provider = Arc::new(MockImageProvider::new());
        let dispatcher = GenerationDispatcher::new(Arc::new(store))
            .route(RoutePredicate::Any, provider.clone());

        let repository = Arc::new(MockContentRepository::with_items(items));
        let orchestrator = Arc::new(ContentOrchestrator::new(
            OrchestratorConfig::default(),
            repository.clone(),
            Arc::new(dispatcher),
        ));

        Harness {
            orchestrator,
            repository,
            provider,
            _dir: dir,
        }
    }

    fn completed(outcome: SweepOutcome) -> SweepReport {
        match outcome {
            SweepOutcome::Completed(report) => report,
            other => panic!("expected completed sweep, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sweep_generates_pending_items() {
        let h = harness(vec![
            content_request("rec1", "a red fox in snow"),
            content_request("rec2", "a lighthouse at dusk"),
        ]);

        let report = completed(h.orchestrator.run_sweep().await);

        assert_eq!(report.generated(), 2);
        for id in ["rec1", "rec2"] {
            let item = h.repository.get(id).await.unwrap();
            assert_eq!(item.status, ContentStatus::Review);
            assert!(item.image_url.is_some());
            assert!(item.error.is_none());
            assert_eq!(
                h.repository.status_history(id).await,
                vec![ContentStatus::InProgress, ContentStatus::Review]
            );
        }
    }

    #[tokio::test]
    async fn test_failed_item_does_not_abort_sweep() {
        let h = harness(vec![
            content_request("rec1", "first"),
            content_request("rec2", "second"),
        ]);
        h.provider
            .set_next_error(GenerationError::no_image("mock"))
            .await;

        let report = completed(h.orchestrator.run_sweep().await);

        assert_eq!(report.failed(), 1);
        assert_eq!(report.generated(), 1);

        let failed = h.repository.get("rec1").await.unwrap();
        assert_eq!(failed.status, ContentStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("No image in mock response"));
        assert!(failed.image_url.is_none());

        let generated = h.repository.get("rec2").await.unwrap();
        assert_eq!(generated.status, ContentStatus::Review);
    }

    #[tokio::test]
    async fn test_empty_prompt_fails_without_provider_call() {
        let h = harness(vec![content_request("rec1", "  ")]);

        let report = completed(h.orchestrator.run_sweep().await);

        assert_eq!(report.failed(), 1);
        assert!(h.provider.recorded_requests().await.is_empty());
        let item = h.repository.get("rec1").await.unwrap();
        assert_eq!(item.status, ContentStatus::Failed);
        assert!(item.error.unwrap().contains("prompt is empty"));
    }

    #[tokio::test]
    async fn test_list_failure_aborts_sweep() {
        let h = harness(vec![content_request("rec1", "fox")]);
        h.repository
            .fail_next_list(RepositoryError::Unavailable("connection refused".to_string()))
            .await;

        let outcome = h.orchestrator.run_sweep().await;

        assert!(matches!(outcome, SweepOutcome::Aborted { ref error } if error.contains("connection refused")));
        assert!(h.provider.recorded_requests().await.is_empty());
        assert_eq!(
            h.repository.get("rec1").await.unwrap().status,
            ContentStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_claim_failure_skips_item_and_continues() {
        let h = harness(vec![
            content_request("rec1", "first"),
            content_request("rec2", "second"),
        ]);
        h.repository
            .fail_next_update(RepositoryError::Unavailable("timeout".to_string()))
            .await;

        let report = completed(h.orchestrator.run_sweep().await);

        assert_eq!(report.store_errors(), 1);
        assert_eq!(report.generated(), 1);
        assert_eq!(report.items[0].id, "rec1");
        assert_eq!(h.provider.recorded_requests().await.len(), 1);
        assert_eq!(
            h.repository.get("rec1").await.unwrap().status,
            ContentStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_concurrent_sweep_is_skipped() {
        let h = harness(vec![content_request("rec1", "slow fox")]);
        h.provider.set_delay(Duration::from_millis(300)).await;

        let first = {
            let orchestrator = Arc::clone(&h.orchestrator);
            tokio::spawn(async move { orchestrator.run_sweep().await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(h.orchestrator.is_sweeping());

        let second = h.orchestrator.run_sweep().await;
        assert!(matches!(second, SweepOutcome::Skipped));

        let first = completed(first.await.unwrap());
        assert_eq!(first.generated(), 1);
        assert_eq!(h.provider.recorded_requests().await.len(), 1);
        assert!(!h.orchestrator.is_sweeping());
    }

    #[tokio::test]
    async fn test_status_reports_counts() {
        let h = harness(vec![
            content_request("rec1", "fox"),
            content_request("rec2", "owl"),
        ]);

        let before = h.orchestrator.status().await.unwrap();
        assert_eq!(before.total, 2);
        assert_eq!(before.status_counts.get("pending"), Some(&2));
        assert!(before.last_sweep_at.is_none());
        assert!(!before.scheduler_running);

        h.orchestrator.run_sweep().await;

        let after = h.orchestrator.status().await.unwrap();
        assert_eq!(after.status_counts.get("review"), Some(&2));
        assert!(after.last_sweep_at.is_some());
        assert!(!after.sweep_in_progress);
    }

    #[tokio::test]
    async fn test_status_surfaces_store_errors() {
        let h = harness(vec![]);
        h.repository
            .fail_next_counts(RepositoryError::Unavailable("down".to_string()))
            .await;

        let err = h.orchestrator.status().await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Store(_)));
    }

    #[tokio::test]
    async fn test_start_stop() {
        let h = harness(vec![]);

        h.orchestrator.start().await;
        assert!(h.orchestrator.is_running());

        // Second start is a no-op
        h.orchestrator.start().await;
        assert!(h.orchestrator.is_running());

        h.orchestrator.stop().await;
        assert!(!h.orchestrator.is_running());
    }

    #[tokio::test]
    async fn test_scheduler_runs_on_startup() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(&StorageConfig {
            root_dir: dir.path().to_path_buf(),
            ..StorageConfig::default()
        })
        .unwrap();
        let provider = Arc::new(MockImageProvider::new());
        let repository = Arc::new(MockContentRepository::with_items(vec![content_request(
            "rec1", "fox",
        )]));
        let orchestrator = ContentOrchestrator::new(
            OrchestratorConfig {
                enabled: true,
                sweep_interval_secs: 3600,
                run_on_startup: true,
            },
            repository.clone(),
            Arc::new(
                GenerationDispatcher::new(Arc::new(store))
                    .route(RoutePredicate::Any, provider.clone()),
            ),
        );

        orchestrator.start().await;
        for _ in 0..50 {
            if repository.get("rec1").await.unwrap().status == ContentStatus::Review {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        orchestrator.stop().await;

        assert_eq!(
            repository.get("rec1").await.unwrap().status,
            ContentStatus::Review
        );
    }
}
