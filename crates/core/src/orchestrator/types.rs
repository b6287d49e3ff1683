//! Types for the content orchestrator.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::content::{ContentStatus, RepositoryError, StatusCounts};

/// Errors that can occur during orchestration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Content repository error.
    #[error("content repository error: {0}")]
    Store(#[from] RepositoryError),

    /// A write would break the status lifecycle.
    #[error("invalid transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: ContentStatus,
        to: ContentStatus,
    },
}

/// What happened to one record during a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// Artifact written and the record moved to review.
    Generated { locator: String, local_path: String },
    /// Generation failed and the record was marked failed.
    Failed { error: String },
    /// The repository rejected a write; the rest of this item was skipped.
    StoreError { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    pub id: String,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

/// Summary of one completed sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub items: Vec<ItemReport>,
}

impl SweepReport {
    pub fn generated(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Generated { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed { .. }))
    }

    pub fn store_errors(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::StoreError { .. }))
    }

    fn count(&self, predicate: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|i| predicate(&i.outcome)).count()
    }
}

/// Result of a sweep request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SweepOutcome {
    /// Another sweep was in progress; nothing was touched.
    Skipped,
    /// Pending records could not be listed.
    Aborted { error: String },
    /// Every pending record was processed.
    Completed(SweepReport),
}

impl SweepOutcome {
    pub fn ran(&self) -> bool {
        !matches!(self, SweepOutcome::Skipped)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SweepOutcome::Skipped => "skipped",
            SweepOutcome::Aborted { .. } => "aborted",
            SweepOutcome::Completed(_) => "completed",
        }
    }
}

/// Current pipeline status.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStatus {
    /// Records per status name.
    pub status_counts: StatusCounts,
    pub total: u64,
    pub sweep_in_progress: bool,
    pub last_sweep_at: Option<DateTime<Utc>>,
    /// Whether the interval scheduler is running.
    pub scheduler_running: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcomes: Vec<ItemOutcome>) -> SweepReport {
        SweepReport {
            started_at: Utc::now(),
            finished_at: Utc::now(),
            items: outcomes
                .into_iter()
                .enumerate()
                .map(|(i, outcome)| ItemReport {
                    id: format!("rec{}", i),
                    outcome,
                })
                .collect(),
        }
    }

    #[test]
    fn test_report_counts() {
        let report = report(vec![
            ItemOutcome::Generated {
                locator: "http://x/beta/a.png".to_string(),
                local_path: "beta/to-be-processed/a.png".to_string(),
            },
            ItemOutcome::Failed {
                error: "OPENAI_API_KEY not set".to_string(),
            },
            ItemOutcome::Failed {
                error: "No image in openrouter response".to_string(),
            },
            ItemOutcome::StoreError {
                error: "Repository unavailable: timeout".to_string(),
            },
        ]);
        assert_eq!(report.generated(), 1);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.store_errors(), 1);
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(SweepOutcome::Skipped).unwrap();
        assert_eq!(json, serde_json::json!({ "outcome": "skipped" }));

        let json = serde_json::to_value(SweepOutcome::Completed(report(vec![ItemOutcome::Failed {
            error: "boom".to_string(),
        }])))
        .unwrap();
        assert_eq!(json["outcome"], "completed");
        assert_eq!(json["items"][0]["id"], "rec0");
        assert_eq!(json["items"][0]["outcome"], "failed");
        assert_eq!(json["items"][0]["error"], "boom");
    }

    #[test]
    fn test_error_display() {
        let err = OrchestratorError::InvalidTransition {
            id: "rec1".to_string(),
            from: ContentStatus::Review,
            to: ContentStatus::InProgress,
        };
        assert_eq!(err.to_string(), "invalid transition for rec1: review -> in_progress");
    }
}
