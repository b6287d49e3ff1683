//! Mock content repository for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::content::{
    ContentRepository, ContentRequest, ContentStatus, ContentUpdate, RepositoryError,
    StatusCounts,
};

/// In-memory implementation of the ContentRepository trait.
///
/// Provides controllable behavior for testing:
/// - Records every status written, per record
/// - Fails the next call of a given operation on request
/// - Optional latency on every call
pub struct MockContentRepository {
    items: Arc<RwLock<Vec<ContentRequest>>>,
    /// Statuses written per record id, in order.
    history: Arc<RwLock<HashMap<String, Vec<ContentStatus>>>>,
    next_list_error: Arc<RwLock<Option<RepositoryError>>>,
    next_update_error: Arc<RwLock<Option<RepositoryError>>>,
    next_counts_error: Arc<RwLock<Option<RepositoryError>>>,
    delay: Arc<RwLock<Option<Duration>>>,
}

impl Default for MockContentRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockContentRepository {
    pub fn new() -> Self {
        Self::with_items(Vec::new())
    }

    /// Repository pre-loaded with `items`.
    pub fn with_items(items: Vec<ContentRequest>) -> Self {
        Self {
            items: Arc::new(RwLock::new(items)),
            history: Arc::new(RwLock::new(HashMap::new())),
            next_list_error: Arc::new(RwLock::new(None)),
            next_update_error: Arc::new(RwLock::new(None)),
            next_counts_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn insert(&self, item: ContentRequest) {
        self.items.write().await.push(item);
    }

    pub async fn get(&self, id: &str) -> Option<ContentRequest> {
        self.items.read().await.iter().find(|i| i.id == id).cloned()
    }

    /// Statuses written for `id`, oldest first.
    pub async fn status_history(&self, id: &str) -> Vec<ContentStatus> {
        self.history
            .read()
            .await
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn fail_next_list(&self, error: RepositoryError) {
        *self.next_list_error.write().await = Some(error);
    }

    /// Fail the next write, whichever status it carries.
    pub async fn fail_next_update(&self, error: RepositoryError) {
        *self.next_update_error.write().await = Some(error);
    }

    pub async fn fail_next_counts(&self, error: RepositoryError) {
        *self.next_counts_error.write().await = Some(error);
    }

    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    async fn simulate_latency(&self) {
        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ContentRepository for MockContentRepository {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list(&self, status: ContentStatus) -> Result<Vec<ContentRequest>, RepositoryError> {
        self.simulate_latency().await;
        if let Some(error) = self.next_list_error.write().await.take() {
            return Err(error);
        }

        let mut matching: Vec<ContentRequest> = self
            .items
            .read()
            .await
            .iter()
            .filter(|i| i.status == status)
            .cloned()
            .collect();
        // Undated records last; stable sort keeps insertion order otherwise.
        matching.sort_by_key(|i| (i.scheduled_date.is_none(), i.scheduled_date));
        Ok(matching)
    }

    async fn update(
        &self,
        id: &str,
        status: ContentStatus,
        fields: ContentUpdate,
    ) -> Result<(), RepositoryError> {
        self.simulate_latency().await;
        if let Some(error) = self.next_update_error.write().await.take() {
            return Err(error);
        }

        let mut items = self.items.write().await;
        let item = items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

        if !item.status.can_transition_to(status) {
            return Err(RepositoryError::InvalidTransition {
                id: id.to_string(),
                from: item.status,
                to: status,
            });
        }

        item.status = status;
        match fields {
            ContentUpdate::StatusOnly => {}
            ContentUpdate::Result {
                image_url,
                local_image_path,
            } => {
                item.image_url = Some(image_url);
                item.local_image_path = Some(local_image_path);
                item.error = None;
            }
            ContentUpdate::Error { message } => {
                item.error = Some(message);
                item.image_url = None;
                item.local_image_path = None;
            }
        }

        self.history
            .write()
            .await
            .entry(id.to_string())
            .or_default()
            .push(status);
        Ok(())
    }

    async fn status_counts(&self) -> Result<StatusCounts, RepositoryError> {
        self.simulate_latency().await;
        if let Some(error) = self.next_counts_error.write().await.take() {
            return Err(error);
        }

        let mut counts = StatusCounts::new();
        for item in self.items.read().await.iter() {
            *counts.entry(item.status.as_str().to_string()).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
