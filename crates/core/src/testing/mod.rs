//! Testing utilities and mock implementations.
//!
//! Mocks for the two external seams of the pipeline, the content repository
//! and the image providers, so sweeps can be exercised without Airtable or
//! any provider account.
//!
//! # Example
//!
//! ```rust,ignore
//! use lumiere_core::testing::{fixtures, MockContentRepository, MockImageProvider};
//!
//! let repository = MockContentRepository::with_items(vec![
//!     fixtures::content_request("rec1", "a red fox in snow"),
//! ]);
//! let provider = MockImageProvider::new();
//!
//! // Wire into a GenerationDispatcher and ContentOrchestrator...
//! ```

mod mock_content_repository;
mod mock_image_provider;

pub use mock_content_repository::MockContentRepository;
pub use mock_image_provider::MockImageProvider;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::content::{
        AspectRatio, ContentRequest, ContentStatus, Quality, DEFAULT_MODEL,
    };
    use crate::generation::GenerationRequest;

    /// A 1x1 transparent PNG.
    pub const PNG_BYTES: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48,
        0x44, 0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00,
        0x00, 0x1F, 0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78,
        0x9C, 0x63, 0x00, 0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00,
        0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];

    /// A pending content request with default model, ratio and quality.
    pub fn content_request(id: &str, prompt: &str) -> ContentRequest {
        ContentRequest {
            id: id.to_string(),
            title: format!("Post {}", id),
            prompt: prompt.to_string(),
            status: ContentStatus::Pending,
            model: DEFAULT_MODEL.to_string(),
            aspect_ratio: AspectRatio::default(),
            quality: Quality::default(),
            reference_images: Vec::new(),
            scheduled_date: None,
            image_url: None,
            local_image_path: None,
            error: None,
        }
    }

    /// A generation request; `model` may be a friendly name or a model id.
    pub fn generation_request(prompt: &str, model: &str) -> GenerationRequest {
        GenerationRequest::new(prompt, model)
    }
}
