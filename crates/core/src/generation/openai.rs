//! OpenAI images adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::GenerationError;
use super::traits::ImageProvider;
use super::types::GenerationRequest;
use crate::config::OpenAiConfig;
use crate::content::{AspectRatio, Quality};
use crate::storage::ArtifactSource;

const PROVIDER: &str = "openai";
const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Pixel size sent for an aspect ratio.
///
/// 4:3 and 3:4 have no matching size on this endpoint and fall back to square.
pub fn image_size(aspect_ratio: AspectRatio) -> &'static str {
    match aspect_ratio {
        AspectRatio::Square => "1024x1024",
        AspectRatio::Landscape => "1792x1024",
        AspectRatio::Portrait => "1024x1792",
        AspectRatio::Classic | AspectRatio::ClassicPortrait => "1024x1024",
    }
}

fn quality_flag(quality: Quality) -> &'static str {
    match quality {
        Quality::High => "hd",
        Quality::Low | Quality::Medium => "standard",
    }
}

#[derive(Debug, Serialize)]
struct ImagesRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'static str,
    quality: &'static str,
    response_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    b64_json: Option<String>,
}

/// Synchronous image generation through `/images/generations`.
pub struct OpenAiProvider {
    client: Client,
    api_key: Option<String>,
    api_base: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(config: &OpenAiConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::transport(PROVIDER, e))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ImageProvider for OpenAiProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<ArtifactSource, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GenerationError::missing_credentials(PROVIDER, API_KEY_VAR))?;

        if matches!(
            request.aspect_ratio,
            AspectRatio::Classic | AspectRatio::ClassicPortrait
        ) {
            debug!(
                "Aspect ratio {} not supported by OpenAI, using 1024x1024",
                request.aspect_ratio
            );
        }
        if !request.references.is_empty() {
            debug!(
                "OpenAI images endpoint ignores {} reference images",
                request.references.len()
            );
        }

        let body = ImagesRequest {
            model: &self.model,
            prompt: &request.prompt,
            n: 1,
            size: image_size(request.aspect_ratio),
            quality: quality_flag(request.quality),
            response_format: "b64_json",
        };

        let response = self
            .client
            .post(format!("{}/images/generations", self.api_base))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::transport(PROVIDER, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Http {
                provider: PROVIDER.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GenerationError::transport(PROVIDER, e))?;
        let payload: ImagesResponse = serde_json::from_slice(&bytes).map_err(|e| {
            debug!("Undecodable {} reply: {}", PROVIDER, e);
            GenerationError::no_image(PROVIDER)
        })?;

        let image = payload
            .data
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::no_image(PROVIDER))?;

        match (image.url, image.b64_json) {
            (Some(url), _) if !url.is_empty() => Ok(ArtifactSource::Url(url)),
            (_, Some(b64)) if !b64.is_empty() => Ok(ArtifactSource::DataUri(format!(
                "data:image/png;base64,{}",
                b64
            ))),
            _ => Err(GenerationError::no_image(PROVIDER)),
        }
    }
}
