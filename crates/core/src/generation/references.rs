//! Reference image download and inlining.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{header::CONTENT_TYPE, Client};
use tracing::{debug, warn};

use crate::metrics;

const DEFAULT_MIME: &str = "image/png";

/// Downloads reference images and turns them into `data:` URIs.
pub struct ReferenceFetcher {
    client: Client,
}

impl ReferenceFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Inline every reference that can be fetched, preserving order.
    ///
    /// A reference that fails is logged and dropped; the rest still apply.
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<String> {
        let mut inlined = Vec::with_capacity(urls.len());
        for url in urls {
            match self.fetch_one(url).await {
                Ok(data_uri) => inlined.push(data_uri),
                Err(e) => {
                    metrics::REFERENCE_FETCH_FAILURES.inc();
                    warn!("Failed to fetch reference image {}: {}", url, e);
                }
            }
        }
        debug!("Inlined {}/{} reference images", inlined.len(), urls.len());
        inlined
    }

    async fn fetch_one(&self, url: &str) -> Result<String, String> {
        let response = self.client.get(url).send().await.map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }

        let mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_MIME)
            .to_string();

        let bytes = response.bytes().await.map_err(|e| e.to_string())?;
        if bytes.is_empty() {
            return Err("empty body".to_string());
        }

        Ok(format!("data:{};base64,{}", mime, STANDARD.encode(&bytes)))
    }
}
