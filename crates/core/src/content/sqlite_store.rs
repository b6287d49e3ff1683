//! SQLite-backed content repository.
//!
//! Used for local runs without an Airtable base and by the integration tests.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{
    AspectRatio, ContentRepository, ContentRequest, ContentStatus, ContentUpdate,
    NewContentRequest, Quality, RepositoryError, StatusCounts,
};

const SELECT_COLUMNS: &str = "id, title, prompt, status, model, aspect_ratio, quality, \
     reference_images, scheduled_date, image_url, local_image_path, error";

/// SQLite-backed content repository.
pub struct SqliteContentRepository {
    conn: Mutex<Connection>,
}

impl SqliteContentRepository {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, RepositoryError> {
        let conn = Connection::open(path).map_err(|e| RepositoryError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory repository (useful for testing).
    pub fn in_memory() -> Result<Self, RepositoryError> {
        let conn =
            Connection::open_in_memory().map_err(|e| RepositoryError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), RepositoryError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS content (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                title TEXT NOT NULL DEFAULT '',
                prompt TEXT NOT NULL,
                status TEXT NOT NULL,
                model TEXT NOT NULL,
                aspect_ratio TEXT NOT NULL,
                quality TEXT NOT NULL,
                reference_images TEXT NOT NULL DEFAULT '[]',
                scheduled_date TEXT,
                image_url TEXT,
                local_image_path TEXT,
                error TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_content_status ON content(status);
            CREATE INDEX IF NOT EXISTS idx_content_scheduled ON content(scheduled_date);
            "#,
        )
        .map_err(|e| RepositoryError::Database(e.to_string()))
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, RepositoryError> {
        self.conn
            .lock()
            .map_err(|_| RepositoryError::Database("connection lock poisoned".to_string()))
    }

    fn row_to_content(row: &rusqlite::Row) -> rusqlite::Result<ContentRequest> {
        let status_str: String = row.get(3)?;
        let aspect_str: String = row.get(5)?;
        let quality_str: String = row.get(6)?;
        let references_json: String = row.get(7)?;
        let scheduled_str: Option<String> = row.get(8)?;

        let status = status_str.parse::<ContentStatus>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            )
        })?;

        let scheduled_date = scheduled_str.and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        });

        Ok(ContentRequest {
            id: row.get(0)?,
            title: row.get(1)?,
            prompt: row.get(2)?,
            status,
            model: row.get(4)?,
            aspect_ratio: AspectRatio::parse_lenient(&aspect_str),
            quality: Quality::parse_lenient(&quality_str),
            reference_images: serde_json::from_str(&references_json).unwrap_or_default(),
            scheduled_date,
            image_url: row.get(9)?,
            local_image_path: row.get(10)?,
            error: row.get(11)?,
        })
    }

    fn fetch(conn: &Connection, id: &str) -> Result<Option<ContentRequest>, RepositoryError> {
        conn.query_row(
            &format!("SELECT {} FROM content WHERE id = ?", SELECT_COLUMNS),
            params![id],
            Self::row_to_content,
        )
        .optional()
        .map_err(|e| RepositoryError::Database(e.to_string()))
    }

    /// Insert a new request in `Pending`.
    pub fn create(&self, request: NewContentRequest) -> Result<ContentRequest, RepositoryError> {
        let conn = self.conn()?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let references_json = serde_json::to_string(&request.reference_images)
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO content (id, created_at, updated_at, title, prompt, status, model, aspect_ratio, quality, reference_images, scheduled_date) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                now,
                now,
                request.title,
                request.prompt,
                ContentStatus::Pending.as_str(),
                request.model,
                request.aspect_ratio.as_str(),
                request.quality.as_str(),
                references_json,
                request.scheduled_date.map(|d| d.to_rfc3339()),
            ],
        )
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(ContentRequest {
            id,
            title: request.title,
            prompt: request.prompt,
            status: ContentStatus::Pending,
            model: request.model,
            aspect_ratio: request.aspect_ratio,
            quality: request.quality,
            reference_images: request.reference_images,
            scheduled_date: request.scheduled_date,
            image_url: None,
            local_image_path: None,
            error: None,
        })
    }

    /// Look up a single request.
    pub fn get(&self, id: &str) -> Result<Option<ContentRequest>, RepositoryError> {
        let conn = self.conn()?;
        Self::fetch(&conn, id)
    }
}

#[async_trait]
impl ContentRepository for SqliteContentRepository {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn list(&self, status: ContentStatus) -> Result<Vec<ContentRequest>, RepositoryError> {
        let conn = self.conn()?;

        let sql = format!(
            "SELECT {} FROM content WHERE status = ? ORDER BY scheduled_date IS NULL, scheduled_date ASC, created_at ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![status.as_str()], Self::row_to_content)
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| RepositoryError::Database(e.to_string()))
    }

    async fn update(
        &self,
        id: &str,
        status: ContentStatus,
        fields: ContentUpdate,
    ) -> Result<(), RepositoryError> {
        let conn = self.conn()?;

        let current =
            Self::fetch(&conn, id)?.ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

        if !current.status.can_transition_to(status) {
            return Err(RepositoryError::InvalidTransition {
                id: id.to_string(),
                from: current.status,
                to: status,
            });
        }

        let now = Utc::now().to_rfc3339();
        let result = match fields {
            ContentUpdate::StatusOnly => conn.execute(
                "UPDATE content SET status = ?, updated_at = ? WHERE id = ?",
                params![status.as_str(), now, id],
            ),
            ContentUpdate::Result {
                image_url,
                local_image_path,
            } => conn.execute(
                "UPDATE content SET status = ?, image_url = ?, local_image_path = ?, error = NULL, updated_at = ? WHERE id = ?",
                params![status.as_str(), image_url, local_image_path, now, id],
            ),
            ContentUpdate::Error { message } => conn.execute(
                "UPDATE content SET status = ?, error = ?, image_url = NULL, local_image_path = NULL, updated_at = ? WHERE id = ?",
                params![status.as_str(), message, now, id],
            ),
        };

        result
            .map(|_| ())
            .map_err(|e| RepositoryError::Database(e.to_string()))
    }

    async fn status_counts(&self) -> Result<StatusCounts, RepositoryError> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare("SELECT status, COUNT(*) FROM content GROUP BY status")
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let mut counts = StatusCounts::new();
        for row in rows {
            let (status, count) = row.map_err(|e| RepositoryError::Database(e.to_string()))?;
            counts.insert(status, count as u64);
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn create_test_repo() -> SqliteContentRepository {
        SqliteContentRepository::in_memory().unwrap()
    }

    #[tokio::test]
    async fn test_create_is_pending() {
        let repo = create_test_repo();
        let created = repo
            .create(NewContentRequest::new("a red fox in snow", "Flux 2").with_title("Fox"))
            .unwrap();

        assert!(!created.id.is_empty());
        assert_eq!(created.status, ContentStatus::Pending);

        let fetched = repo.get(&created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_list_orders_by_schedule_then_creation() {
        let repo = create_test_repo();
        let unscheduled = repo.create(NewContentRequest::new("c", "Flux 2")).unwrap();
        let later = repo
            .create(
                NewContentRequest::new("b", "Flux 2")
                    .with_scheduled_date(Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()),
            )
            .unwrap();
        let sooner = repo
            .create(
                NewContentRequest::new("a", "Flux 2")
                    .with_scheduled_date(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()),
            )
            .unwrap();

        let pending = repo.list(ContentStatus::Pending).await.unwrap();
        let ids: Vec<_> = pending.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec![sooner.id.as_str(), later.id.as_str(), unscheduled.id.as_str()]);

        assert!(repo.list(ContentStatus::Review).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_result_and_error_are_exclusive() {
        let repo = create_test_repo();
        let created = repo.create(NewContentRequest::new("fox", "Flux 2")).unwrap();

        repo.update(&created.id, ContentStatus::InProgress, ContentUpdate::StatusOnly)
            .await
            .unwrap();
        repo.set_result(&created.id, "http://host/beta/x.png", "to-be-processed/x.png")
            .await
            .unwrap();

        let reviewed = repo.get(&created.id).unwrap().unwrap();
        assert_eq!(reviewed.status, ContentStatus::Review);
        assert_eq!(reviewed.image_url.as_deref(), Some("http://host/beta/x.png"));
        assert!(reviewed.error.is_none());

        repo.set_error(&created.id, "rejected downstream").await.unwrap();
        let failed = repo.get(&created.id).unwrap().unwrap();
        assert_eq!(failed.status, ContentStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("rejected downstream"));
        assert!(failed.image_url.is_none());
        assert!(failed.local_image_path.is_none());
    }

    #[tokio::test]
    async fn test_invalid_transition_rejected() {
        let repo = create_test_repo();
        let created = repo.create(NewContentRequest::new("fox", "Flux 2")).unwrap();

        let err = repo
            .update(&created.id, ContentStatus::Review, ContentUpdate::StatusOnly)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::InvalidTransition {
                from: ContentStatus::Pending,
                to: ContentStatus::Review,
                ..
            }
        ));

        let unchanged = repo.get(&created.id).unwrap().unwrap();
        assert_eq!(unchanged.status, ContentStatus::Pending);
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let repo = create_test_repo();
        let err = repo
            .update("missing", ContentStatus::InProgress, ContentUpdate::StatusOnly)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_status_counts() {
        let repo = create_test_repo();
        let a = repo.create(NewContentRequest::new("a", "Flux 2")).unwrap();
        repo.create(NewContentRequest::new("b", "Flux 2")).unwrap();
        repo.update(&a.id, ContentStatus::InProgress, ContentUpdate::StatusOnly)
            .await
            .unwrap();

        let counts = repo.status_counts().await.unwrap();
        assert_eq!(counts.get("pending"), Some(&1));
        assert_eq!(counts.get("in_progress"), Some(&1));
        assert_eq!(counts.values().sum::<u64>(), 2);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content.db");

        let id = {
            let repo = SqliteContentRepository::new(&path).unwrap();
            repo.create(
                NewContentRequest::new("fox", "GPT Image")
                    .with_references(vec!["https://example.com/ref.png".to_string()]),
            )
            .unwrap()
            .id
        };

        let reopened = SqliteContentRepository::new(&path).unwrap();
        let fetched = reopened.get(&id).unwrap().unwrap();
        assert_eq!(fetched.model, "GPT Image");
        assert_eq!(fetched.reference_images, vec!["https://example.com/ref.png"]);
    }
}
