//! Airtable-backed content repository.
//!
//! Records live in one table of an Airtable base. Status is a single-select
//! field whose labels differ from [`ContentStatus`] names for the first two
//! states ("Idea" and "Generating").

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{
    AspectRatio, ContentRepository, ContentRequest, ContentStatus, ContentUpdate, Quality,
    RepositoryError, StatusCounts, DEFAULT_MODEL,
};
use crate::config::AirtableConfig;

/// Airtable label for a status.
pub fn status_label(status: ContentStatus) -> &'static str {
    match status {
        ContentStatus::Pending => "Idea",
        ContentStatus::InProgress => "Generating",
        ContentStatus::Review => "Review",
        ContentStatus::Approved => "Approved",
        ContentStatus::Scheduled => "Scheduled",
        ContentStatus::Published => "Published",
        ContentStatus::Failed => "Failed",
    }
}

/// Status for an Airtable label, if the label is one we manage.
pub fn status_from_label(label: &str) -> Option<ContentStatus> {
    ContentStatus::ALL
        .into_iter()
        .find(|status| status_label(*status) == label)
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    records: Vec<AirtableRecord>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AirtableRecord {
    id: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

/// Content repository backed by the Airtable REST API.
pub struct AirtableRepository {
    client: Client,
    api_base: String,
    base_id: String,
    table: String,
    api_key: String,
}

impl AirtableRepository {
    /// Create a repository client. Both the token and the base id are required.
    pub fn new(config: &AirtableConfig) -> Result<Self, RepositoryError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| RepositoryError::Unavailable("AIRTABLE_PAT not set".to_string()))?;
        let base_id = config
            .base_id
            .clone()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| RepositoryError::Unavailable("AIRTABLE_BASE_ID not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RepositoryError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            base_id,
            table: config.table.clone(),
            api_key,
        })
    }

    fn table_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.api_base,
            self.base_id,
            urlencoding::encode(&self.table)
        )
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(
        response: Response,
    ) -> Result<T, RepositoryError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RepositoryError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| RepositoryError::Parse(format!("Failed to parse Airtable response: {}", e)))
    }

    /// Page through every record matching `formula`, sorted by scheduled date.
    async fn fetch_all(
        &self,
        formula: Option<&str>,
        fields: &[&str],
    ) -> Result<Vec<AirtableRecord>, RepositoryError> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut query: Vec<(&str, String)> = vec![
                ("sort[0][field]", "ScheduledDate".to_string()),
                ("sort[0][direction]", "asc".to_string()),
            ];
            if let Some(formula) = formula {
                query.push(("filterByFormula", formula.to_string()));
            }
            for field in fields {
                query.push(("fields[]", field.to_string()));
            }
            if let Some(ref next) = offset {
                query.push(("offset", next.clone()));
            }

            let response = self
                .client
                .get(self.table_url())
                .bearer_auth(&self.api_key)
                .query(&query)
                .send()
                .await
                .map_err(|e| RepositoryError::Unavailable(e.to_string()))?;

            let page: ListResponse = Self::read_json(response).await?;
            debug!(
                "Airtable page: {} records, more={}",
                page.records.len(),
                page.offset.is_some()
            );
            records.extend(page.records);

            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(records)
    }

    fn record_to_content(record: AirtableRecord, status: ContentStatus) -> ContentRequest {
        let fields = &record.fields;
        let text = |name: &str| fields.get(name).and_then(Value::as_str).map(str::to_string);

        let reference_images = fields
            .get("ReferenceImages")
            .and_then(Value::as_array)
            .map(|attachments| {
                attachments
                    .iter()
                    .filter_map(|a| match a {
                        Value::String(url) => Some(url.clone()),
                        other => other.get("url").and_then(Value::as_str).map(str::to_string),
                    })
                    .filter(|url| !url.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        ContentRequest {
            id: record.id,
            title: text("Title").unwrap_or_default(),
            prompt: text("Prompt").unwrap_or_default(),
            status,
            model: text("Model").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            aspect_ratio: text("AspectRatio")
                .map(|a| AspectRatio::parse_lenient(&a))
                .unwrap_or_default(),
            quality: text("Quality")
                .map(|q| Quality::parse_lenient(&q))
                .unwrap_or_default(),
            reference_images,
            scheduled_date: text("ScheduledDate").and_then(|d| parse_scheduled_date(&d)),
            image_url: text("ImageURL"),
            local_image_path: text("LocalImagePath"),
            error: text("Error"),
        }
    }
}

/// Airtable date fields come back either as a full timestamp or a bare date.
fn parse_scheduled_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[async_trait]
impl ContentRepository for AirtableRepository {
    fn name(&self) -> &str {
        "airtable"
    }

    async fn list(&self, status: ContentStatus) -> Result<Vec<ContentRequest>, RepositoryError> {
        let formula = format!("{{Status}}='{}'", status_label(status));
        let records = self.fetch_all(Some(&formula), &[]).await?;

        Ok(records
            .into_iter()
            .map(|record| Self::record_to_content(record, status))
            .collect())
    }

    /// Writes are not checked against the current label; Airtable offers no
    /// conditional update, so callers validate transitions before writing.
    async fn update(
        &self,
        id: &str,
        status: ContentStatus,
        fields: ContentUpdate,
    ) -> Result<(), RepositoryError> {
        let mut body = Map::new();
        body.insert("Status".to_string(), json!(status_label(status)));

        match fields {
            ContentUpdate::StatusOnly => {}
            ContentUpdate::Result {
                image_url,
                local_image_path,
            } => {
                body.insert("ImageURL".to_string(), json!(image_url));
                body.insert("LocalImagePath".to_string(), json!(local_image_path));
                body.insert("Error".to_string(), Value::Null);
            }
            ContentUpdate::Error { message } => {
                body.insert("Error".to_string(), json!(message));
                body.insert("ImageURL".to_string(), Value::Null);
                body.insert("LocalImagePath".to_string(), Value::Null);
            }
        }

        debug!("Airtable update {}: status={}", id, status_label(status));

        let response = self
            .client
            .patch(format!("{}/{}", self.table_url(), id))
            .bearer_auth(&self.api_key)
            .json(&json!({ "fields": body }))
            .send()
            .await
            .map_err(|e| RepositoryError::Unavailable(e.to_string()))?;

        if response.status() == 404 {
            return Err(RepositoryError::NotFound(id.to_string()));
        }

        let _: Value = Self::read_json(response).await?;
        Ok(())
    }

    async fn status_counts(&self) -> Result<StatusCounts, RepositoryError> {
        let records = self.fetch_all(None, &["Status"]).await?;

        let mut counts = StatusCounts::new();
        for record in records {
            let key = match record.fields.get("Status").and_then(Value::as_str) {
                Some(label) => status_from_label(label)
                    .map(|s| s.as_str().to_string())
                    .unwrap_or_else(|| label.to_string()),
                None => "unknown".to_string(),
            };
            *counts.entry(key).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> AirtableConfig {
        AirtableConfig {
            api_key: Some("pat-test".to_string()),
            base_id: Some("appTEST".to_string()),
            table: "Content".to_string(),
            api_base: server.uri(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_labels_roundtrip() {
        for status in ContentStatus::ALL {
            assert_eq!(status_from_label(status_label(status)), Some(status));
        }
        assert_eq!(status_label(ContentStatus::Pending), "Idea");
        assert_eq!(status_label(ContentStatus::InProgress), "Generating");
        assert_eq!(status_from_label("Archived"), None);
    }

    #[test]
    fn test_missing_credentials() {
        let config = AirtableConfig {
            api_key: None,
            base_id: Some("appTEST".to_string()),
            ..AirtableConfig::default()
        };
        let err = AirtableRepository::new(&config).err().unwrap();
        assert_eq!(err.to_string(), "Repository unavailable: AIRTABLE_PAT not set");
    }

    #[test]
    fn test_table_name_is_encoded() {
        let config = AirtableConfig {
            api_key: Some("pat".to_string()),
            base_id: Some("appX".to_string()),
            ..AirtableConfig::default()
        };
        let repo = AirtableRepository::new(&config).unwrap();
        assert_eq!(
            repo.table_url(),
            "https://api.airtable.com/v0/appX/Content%20Calendar"
        );
    }

    #[test]
    fn test_parse_scheduled_date_forms() {
        assert!(parse_scheduled_date("2026-03-01").is_some());
        assert!(parse_scheduled_date("2026-03-01T09:30:00.000Z").is_some());
        assert!(parse_scheduled_date("next tuesday").is_none());
    }

    #[tokio::test]
    async fn test_list_applies_defaults_and_paginates() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/appTEST/Content"))
            .and(query_param("offset", "page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "records": [{ "id": "rec2", "fields": { "Prompt": "second", "Status": "Idea" } }]
            })))
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/appTEST/Content"))
            .and(header("authorization", "Bearer pat-test"))
            .and(query_param("filterByFormula", "{Status}='Idea'"))
            .and(query_param("sort[0][field]", "ScheduledDate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "records": [{
                    "id": "rec1",
                    "fields": {
                        "Title": "Fox",
                        "Prompt": "a red fox in snow",
                        "Status": "Idea",
                        "Model": "Flux 2",
                        "AspectRatio": "16:9",
                        "Quality": "high",
                        "ReferenceImages": [
                            { "url": "https://cdn.example.com/a.png" },
                            { "url": "" }
                        ],
                        "ScheduledDate": "2026-03-01"
                    }
                }],
                "offset": "page2"
            })))
            .mount(&server)
            .await;

        let repo = AirtableRepository::new(&config_for(&server)).unwrap();
        let items = repo.list(ContentStatus::Pending).await.unwrap();

        assert_eq!(items.len(), 2);
        let first = &items[0];
        assert_eq!(first.id, "rec1");
        assert_eq!(first.model, "Flux 2");
        assert_eq!(first.aspect_ratio, AspectRatio::Landscape);
        assert_eq!(first.quality, Quality::High);
        assert_eq!(first.reference_images, vec!["https://cdn.example.com/a.png"]);
        assert!(first.scheduled_date.is_some());

        let second = &items[1];
        assert_eq!(second.model, DEFAULT_MODEL);
        assert_eq!(second.aspect_ratio, AspectRatio::Square);
        assert_eq!(second.quality, Quality::Medium);
        assert_eq!(second.status, ContentStatus::Pending);
    }

    #[tokio::test]
    async fn test_set_error_clears_result_fields() {
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/appTEST/Content/rec1"))
            .and(body_partial_json(json!({
                "fields": {
                    "Status": "Failed",
                    "Error": "OPENROUTER_API_KEY not set",
                    "ImageURL": null
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "rec1", "fields": {} })))
            .expect(1)
            .mount(&server)
            .await;

        let repo = AirtableRepository::new(&config_for(&server)).unwrap();
        repo.set_error("rec1", "OPENROUTER_API_KEY not set")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_api_error_is_surfaced() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let repo = AirtableRepository::new(&config_for(&server)).unwrap();
        let err = repo.list(ContentStatus::Pending).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Api { status: 503, ref message } if message == "maintenance"));
    }

    #[tokio::test]
    async fn test_status_counts_by_label() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/appTEST/Content"))
            .and(query_param("fields[]", "Status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "records": [
                    { "id": "a", "fields": { "Status": "Idea" } },
                    { "id": "b", "fields": { "Status": "Idea" } },
                    { "id": "c", "fields": { "Status": "Review" } },
                    { "id": "d", "fields": { "Status": "Archived" } },
                    { "id": "e", "fields": {} }
                ]
            })))
            .mount(&server)
            .await;

        let repo = AirtableRepository::new(&config_for(&server)).unwrap();
        let counts = repo.status_counts().await.unwrap();

        assert_eq!(counts.get("pending"), Some(&2));
        assert_eq!(counts.get("review"), Some(&1));
        assert_eq!(counts.get("Archived"), Some(&1));
        assert_eq!(counts.get("unknown"), Some(&1));
    }
}
