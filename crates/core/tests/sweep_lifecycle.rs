//! Sweep lifecycle integration tests.
//!
//! These tests run whole sweeps against a SQLite repository and a real
//! filesystem artifact store:
//! pending -> in_progress -> review | failed

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use lumiere_core::{
    config::{ProvidersConfig, StorageConfig},
    testing::MockImageProvider,
    ContentOrchestrator, ContentRepository, ContentStatus, ContentUpdate, FsArtifactStore,
    GenerationDispatcher, GenerationError, NewContentRequest, OrchestratorConfig,
    RoutePredicate, SqliteContentRepository, SweepOutcome, SweepReport,
};

/// Test helper owning the repository, artifact root and provider mock.
struct TestHarness {
    repository: Arc<SqliteContentRepository>,
    provider: Arc<MockImageProvider>,
    storage: StorageConfig,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let repository = Arc::new(
            SqliteContentRepository::new(&temp_dir.path().join("content.db"))
                .expect("Failed to create repository"),
        );
        let storage = StorageConfig {
            root_dir: temp_dir.path().join("beta"),
            public_url: "https://media.example.com".to_string(),
            ..StorageConfig::default()
        };

        Self {
            repository,
            provider: Arc::new(MockImageProvider::new()),
            storage,
            _temp_dir: temp_dir,
        }
    }

    fn store(&self) -> Arc<FsArtifactStore> {
        Arc::new(FsArtifactStore::new(&self.storage).expect("Failed to create store"))
    }

    /// Orchestrator that sends every model to the mock provider.
    fn orchestrator(&self) -> Arc<ContentOrchestrator> {
        let dispatcher =
            GenerationDispatcher::new(self.store()).route(RoutePredicate::Any, self.provider.clone());
        self.orchestrator_with(dispatcher)
    }

    fn orchestrator_with(&self, dispatcher: GenerationDispatcher) -> Arc<ContentOrchestrator> {
        Arc::new(ContentOrchestrator::new(
            OrchestratorConfig::default(),
            self.repository.clone(),
            Arc::new(dispatcher),
        ))
    }

    fn create(&self, prompt: &str, model: &str) -> String {
        self.repository
            .create(NewContentRequest::new(prompt, model))
            .expect("Failed to create content")
            .id
    }

    fn status_of(&self, id: &str) -> ContentStatus {
        self.repository.get(id).unwrap().unwrap().status
    }

    fn output_files(&self) -> Vec<String> {
        let dir = self.storage.root_dir.join(&self.storage.output_dir);
        match std::fs::read_dir(dir) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

fn completed(outcome: SweepOutcome) -> SweepReport {
    match outcome {
        SweepOutcome::Completed(report) => report,
        other => panic!("expected completed sweep, got {:?}", other),
    }
}

#[tokio::test]
async fn test_sweep_moves_every_pending_item_to_review() {
    let harness = TestHarness::new();
    let fox = harness.create("a red fox in snow", "Flux 2");
    let owl = harness.create("an owl at midnight", "Gemini 3");

    let report = completed(harness.orchestrator().run_sweep().await);
    assert_eq!(report.generated(), 2);

    for id in [&fox, &owl] {
        let item = harness.repository.get(id).unwrap().unwrap();
        assert_eq!(item.status, ContentStatus::Review);
        assert!(item.error.is_none());

        let local = PathBuf::from(item.local_image_path.unwrap());
        assert_eq!(
            local.parent(),
            Some(harness.storage.root_dir.join("to-be-processed").as_path())
        );
        assert!(local.exists());
        assert_eq!(
            item.image_url.unwrap(),
            format!(
                "https://media.example.com/beta/to-be-processed/{}",
                local.file_name().unwrap().to_str().unwrap()
            )
        );
    }

    // One image and one sidecar per item
    let files = harness.output_files();
    assert_eq!(files.iter().filter(|f| f.ends_with(".png")).count(), 2);
    assert_eq!(files.iter().filter(|f| f.ends_with(".json")).count(), 2);

    // Nothing left for a second sweep
    let again = completed(harness.orchestrator().run_sweep().await);
    assert!(again.items.is_empty());
}

#[tokio::test]
async fn test_sweep_processes_in_schedule_order() {
    let harness = TestHarness::new();
    let later = harness
        .repository
        .create(
            NewContentRequest::new("later", "Flux 2")
                .with_scheduled_date(Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()),
        )
        .unwrap();
    let unscheduled = harness.create("whenever", "Flux 2");
    let sooner = harness
        .repository
        .create(
            NewContentRequest::new("sooner", "Flux 2")
                .with_scheduled_date(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()),
        )
        .unwrap();

    let report = completed(harness.orchestrator().run_sweep().await);

    let order: Vec<&str> = report.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(order, vec![sooner.id.as_str(), later.id.as_str(), unscheduled.as_str()]);

    let prompts: Vec<String> = harness
        .provider
        .recorded_requests()
        .await
        .into_iter()
        .map(|r| r.prompt)
        .collect();
    assert_eq!(prompts, vec!["sooner", "later", "whenever"]);
}

#[tokio::test]
async fn test_non_pending_items_are_untouched() {
    let harness = TestHarness::new();
    let reviewed = harness.create("already done", "Flux 2");
    harness
        .repository
        .update(&reviewed, ContentStatus::InProgress, ContentUpdate::StatusOnly)
        .await
        .unwrap();
    harness
        .repository
        .set_result(&reviewed, "https://media.example.com/beta/x.png", "to-be-processed/x.png")
        .await
        .unwrap();
    let stuck = harness.create("claimed elsewhere", "Flux 2");
    harness
        .repository
        .update(&stuck, ContentStatus::InProgress, ContentUpdate::StatusOnly)
        .await
        .unwrap();

    let report = completed(harness.orchestrator().run_sweep().await);

    assert!(report.items.is_empty());
    assert_eq!(harness.status_of(&reviewed), ContentStatus::Review);
    assert_eq!(harness.status_of(&stuck), ContentStatus::InProgress);
    assert!(harness.provider.recorded_requests().await.is_empty());
}

#[tokio::test]
async fn test_provider_failure_is_recorded() {
    let harness = TestHarness::new();
    let id = harness.create("a red fox in snow", "Flux 2");
    harness
        .provider
        .set_next_error(GenerationError::Http {
            provider: "openrouter".to_string(),
            status: 429,
            body: "rate limited".to_string(),
        })
        .await;

    let report = completed(harness.orchestrator().run_sweep().await);
    assert_eq!(report.failed(), 1);

    let item = harness.repository.get(&id).unwrap().unwrap();
    assert_eq!(item.status, ContentStatus::Failed);
    assert_eq!(
        item.error.as_deref(),
        Some("openrouter API error (429): rate limited")
    );
    assert!(item.image_url.is_none());
    assert!(harness.output_files().is_empty());

    // Failed is terminal; later sweeps leave it alone
    let again = completed(harness.orchestrator().run_sweep().await);
    assert!(again.items.is_empty());
    assert_eq!(harness.provider.recorded_requests().await.len(), 1);
}

#[tokio::test]
async fn test_missing_credentials_fail_without_writing() {
    let harness = TestHarness::new();
    let direct = harness.create("a lighthouse", "GPT Image");
    let chat = harness.create("a fox", "Flux 2");

    let dispatcher =
        GenerationDispatcher::from_config(&ProvidersConfig::default(), harness.store()).unwrap();
    let report = completed(harness.orchestrator_with(dispatcher).run_sweep().await);

    assert_eq!(report.failed(), 2);
    let direct = harness.repository.get(&direct).unwrap().unwrap();
    assert_eq!(direct.status, ContentStatus::Failed);
    assert_eq!(direct.error.as_deref(), Some("OPENAI_API_KEY not set"));

    let chat = harness.repository.get(&chat).unwrap().unwrap();
    assert_eq!(chat.error.as_deref(), Some("OPENROUTER_API_KEY not set"));

    assert!(harness.output_files().is_empty());
}

#[tokio::test]
async fn test_overlapping_sweeps_are_single_flight() {
    let harness = TestHarness::new();
    let id = harness.create("a slow fox", "Flux 2");
    harness.provider.set_delay(Duration::from_millis(300)).await;
    let orchestrator = harness.orchestrator();

    let first = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.run_sweep().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let concurrent: Vec<SweepOutcome> = request_sweeps(&orchestrator, 3).await;
    assert!(concurrent.iter().all(|o| matches!(o, SweepOutcome::Skipped)));

    let first = completed(first.await.unwrap());
    assert_eq!(first.generated(), 1);
    assert_eq!(harness.provider.recorded_requests().await.len(), 1);
    assert_eq!(harness.status_of(&id), ContentStatus::Review);

    let status = orchestrator.status().await.unwrap();
    assert!(!status.sweep_in_progress);
    assert_eq!(status.status_counts.get("review"), Some(&1));
}

/// Request `n` sweeps at once while another is running.
async fn request_sweeps(orchestrator: &Arc<ContentOrchestrator>, n: usize) -> Vec<SweepOutcome> {
    let handles: Vec<_> = (0..n)
        .map(|_| {
            let orchestrator = Arc::clone(orchestrator);
            tokio::spawn(async move { orchestrator.run_sweep().await })
        })
        .collect();

    let mut outcomes = Vec::with_capacity(n);
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }
    outcomes
}
