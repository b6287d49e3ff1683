//! OpenRouter chat-completions adapter for multimodal image models.
//!
//! Gemini and Flux image models are reached through the chat endpoint with
//! `modalities: ["text", "image"]`. Reference images travel inline as
//! base64 `image_url` parts.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::error::GenerationError;
use super::references::ReferenceFetcher;
use super::traits::ImageProvider;
use super::types::GenerationRequest;
use crate::config::OpenRouterConfig;
use crate::content::Quality;
use crate::storage::ArtifactSource;

const PROVIDER: &str = "openrouter";
const API_KEY_VAR: &str = "OPENROUTER_API_KEY";

/// Provider-specific knobs for a quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityKnobs {
    /// `image_config.image_size` for Gemini models.
    pub image_size: &'static str,
    /// `provider.flux.num_inference_steps` for Flux models.
    pub inference_steps: u32,
}

pub fn quality_knobs(quality: Quality) -> QualityKnobs {
    match quality {
        Quality::Low => QualityKnobs {
            image_size: "1K",
            inference_steps: 15,
        },
        Quality::Medium => QualityKnobs {
            image_size: "1K",
            inference_steps: 28,
        },
        Quality::High => QualityKnobs {
            image_size: "2K",
            inference_steps: 50,
        },
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    modalities: [&'static str; 2],
    image_config: ImageConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<ProviderOptions>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    ImageUrl { image_url: ImageUrl },
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ImageConfig {
    aspect_ratio: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_size: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct ProviderOptions {
    flux: FluxOptions,
}

#[derive(Debug, Serialize)]
struct FluxOptions {
    num_inference_steps: u32,
}

// ============================================================================
// Adapter
// ============================================================================

/// OpenRouter image generation through chat completions.
pub struct OpenRouterProvider {
    client: Client,
    api_key: Option<String>,
    api_base: String,
    references: ReferenceFetcher,
}

impl OpenRouterProvider {
    pub fn new(
        config: &OpenRouterConfig,
        reference_timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::transport(PROVIDER, e))?;
        let references = ReferenceFetcher::new(reference_timeout)
            .map_err(|e| GenerationError::transport(PROVIDER, e))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            references,
        })
    }

    fn build_body<'a>(request: &'a GenerationRequest, inlined: Vec<String>) -> ChatRequest<'a> {
        // Requested references frame the prompt even when none could be fetched.
        let content = if request.references.is_empty() {
            MessageContent::Text(request.prompt.clone())
        } else {
            let mut parts: Vec<ContentPart> = inlined
                .into_iter()
                .map(|url| ContentPart::ImageUrl {
                    image_url: ImageUrl { url },
                })
                .collect();
            parts.push(ContentPart::Text {
                text: format!("Using the reference images: {}", request.prompt),
            });
            MessageContent::Parts(parts)
        };

        let knobs = quality_knobs(request.quality);
        let model = request.model.to_ascii_lowercase();
        let is_gemini = model.contains("gemini");
        let is_flux = !is_gemini && model.contains("flux");

        ChatRequest {
            model: &request.model,
            messages: vec![ChatMessage {
                role: "user",
                content,
            }],
            modalities: ["text", "image"],
            image_config: ImageConfig {
                aspect_ratio: request.aspect_ratio.as_str(),
                image_size: is_gemini.then_some(knobs.image_size),
            },
            provider: is_flux.then_some(ProviderOptions {
                flux: FluxOptions {
                    num_inference_steps: knobs.inference_steps,
                },
            }),
        }
    }
}

/// Pull the first image out of a chat completion.
///
/// Accepts `message.images[0]` (object with `image_url.url` or `url`, or a
/// bare string) and falls back to an `image_url` part in `message.content`.
fn extract_image(response: &Value) -> Option<String> {
    let message = response.pointer("/choices/0/message")?;

    if let Some(first) = message
        .get("images")
        .and_then(Value::as_array)
        .and_then(|images| images.first())
    {
        let url = match first {
            Value::String(s) => Some(s.as_str()),
            other => other
                .pointer("/image_url/url")
                .and_then(Value::as_str)
                .filter(|u| !u.is_empty())
                .or_else(|| other.get("url").and_then(Value::as_str)),
        };
        if let Some(url) = url.filter(|u| !u.is_empty()) {
            return Some(url.to_string());
        }
    }

    message
        .get("content")
        .and_then(Value::as_array)?
        .iter()
        .find(|part| part.get("type").and_then(Value::as_str) == Some("image_url"))
        .and_then(|part| part.pointer("/image_url/url"))
        .and_then(Value::as_str)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl ImageProvider for OpenRouterProvider {
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

        let inlined = if request.references.is_empty() {
            Vec::new()
        } else {
            self.references.fetch_all(&request.references).await
        };

        let body = Self::build_body(request, inlined);
        debug!(
            "OpenRouter request: model={}, aspect={}, quality={}, references={}",
            request.model,
            request.aspect_ratio,
            request.quality,
            request.references.len()
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
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
        let payload: Value = serde_json::from_slice(&bytes).map_err(|e| {
            debug!("Undecodable {} reply: {}", PROVIDER, e);
            GenerationError::no_image(PROVIDER)
        })?;

        extract_image(&payload)
            .map(ArtifactSource::from_encoded)
            .ok_or_else(|| GenerationError::no_image(PROVIDER))
    }
}
