//! Normalized generation request.

use serde::Serialize;

use super::error::GenerationError;
use super::models::resolve_model;
use crate::content::{AspectRatio, ContentRequest, Quality};

/// Provider-agnostic description of one image to generate.
///
/// The model is already resolved to a concrete id. Adapters and stores only
/// ever borrow it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: String,
    /// Reference image URLs, in prompt order.
    pub references: Vec<String>,
    pub aspect_ratio: AspectRatio,
    pub quality: Quality,
}

impl GenerationRequest {
    /// Build a request, resolving `model` through the alias table.
    pub fn new(prompt: impl Into<String>, model: &str) -> Self {
        Self {
            prompt: prompt.into(),
            model: resolve_model(model),
            references: Vec::new(),
            aspect_ratio: AspectRatio::default(),
            quality: Quality::default(),
        }
    }

    pub fn with_references(mut self, references: Vec<String>) -> Self {
        self.references = references;
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Derive a request from a stored content record.
    pub fn from_content(content: &ContentRequest) -> Result<Self, GenerationError> {
        if content.prompt.trim().is_empty() {
            return Err(GenerationError::InvalidRequest(
                "prompt is empty".to_string(),
            ));
        }

        Ok(Self::new(content.prompt.clone(), &content.model)
            .with_references(content.reference_images.clone())
            .with_aspect_ratio(content.aspect_ratio)
            .with_quality(content.quality))
    }
}
