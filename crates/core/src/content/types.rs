//! Core content request data types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Friendly model name used when a record does not name one.
pub const DEFAULT_MODEL: &str = "Gemini 3";

/// Aggregate record counts keyed by status name.
pub type StatusCounts = BTreeMap<String, u64>;

// ============================================================================
// Status
// ============================================================================

/// Lifecycle status of a content request.
///
/// ```text
/// Pending -> InProgress -> Review -> Approved -> Scheduled -> Published
///                      \-> Failed    (any non-terminal state may also fail)
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    /// Waiting for generation. The only entry state.
    Pending,
    /// Claimed by a sweep; generation is running or was interrupted.
    InProgress,
    /// Generated and waiting for a human decision.
    Review,
    Approved,
    Scheduled,
    Published,
    Failed,
}

impl ContentStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [ContentStatus; 7] = [
        ContentStatus::Pending,
        ContentStatus::InProgress,
        ContentStatus::Review,
        ContentStatus::Approved,
        ContentStatus::Scheduled,
        ContentStatus::Published,
        ContentStatus::Failed,
    ];

    /// Stable snake_case name, used for storage and API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Pending => "pending",
            ContentStatus::InProgress => "in_progress",
            ContentStatus::Review => "review",
            ContentStatus::Approved => "approved",
            ContentStatus::Scheduled => "scheduled",
            ContentStatus::Published => "published",
            ContentStatus::Failed => "failed",
        }
    }

    /// Terminal states have no successors.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ContentStatus::Published | ContentStatus::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// Nothing ever moves back to `Pending`.
    pub fn can_transition_to(&self, next: ContentStatus) -> bool {
        use ContentStatus::*;
        match (*self, next) {
            (Pending, InProgress) => true,
            (InProgress, Review) => true,
            (Review, Approved) | (Approved, Scheduled) | (Scheduled, Published) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown content status: {}", s))
    }
}

// ============================================================================
// Generation parameters
// ============================================================================

/// Output aspect ratio.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "4:3")]
    Classic,
    #[serde(rename = "3:4")]
    ClassicPortrait,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Classic => "4:3",
            AspectRatio::ClassicPortrait => "3:4",
        }
    }

    /// Parse a ratio coming from an external record, falling back to 1:1.
    pub fn parse_lenient(value: &str) -> Self {
        value.trim().parse().unwrap_or_else(|_| {
            warn!("Unknown aspect ratio '{}', using 1:1", value);
            AspectRatio::Square
        })
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1:1" => Ok(AspectRatio::Square),
            "16:9" => Ok(AspectRatio::Landscape),
            "9:16" => Ok(AspectRatio::Portrait),
            "4:3" => Ok(AspectRatio::Classic),
            "3:4" => Ok(AspectRatio::ClassicPortrait),
            other => Err(format!("unsupported aspect ratio: {}", other)),
        }
    }
}

/// Quality tier requested for a generation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    #[default]
    Medium,
    High,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Low => "low",
            Quality::Medium => "medium",
            Quality::High => "high",
        }
    }

    /// Parse a tier coming from an external record; unknown values mean medium.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Quality::Low,
            "high" => Quality::High,
            "medium" => Quality::Medium,
            other => {
                warn!("Unknown quality '{}', using medium", other);
                Quality::Medium
            }
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Records
// ============================================================================

/// A unit of work held by the content repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentRequest {
    /// Repository-owned identifier.
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub prompt: String,
    pub status: ContentStatus,
    /// Friendly model name ("Flux 2") or a concrete provider model id.
    pub model: String,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub quality: Quality,
    /// Reference image URLs, in prompt order.
    #[serde(default)]
    pub reference_images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<DateTime<Utc>>,
    /// Public locator of the generated artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Fields written together with a status change.
///
/// A result and an error are never written together: recording one clears
/// the other.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ContentUpdate {
    /// Only the status changes.
    #[default]
    StatusOnly,
    /// Generated artifact locator and its local path.
    Result {
        image_url: String,
        local_image_path: String,
    },
    /// Failure text, preserved verbatim.
    Error { message: String },
}

impl ContentUpdate {
    pub fn result(image_url: impl Into<String>, local_image_path: impl Into<String>) -> Self {
        Self::Result {
            image_url: image_url.into(),
            local_image_path: local_image_path.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Request to create a new pending content record.
#[derive(Debug, Clone)]
pub struct NewContentRequest {
    pub title: String,
    pub prompt: String,
    pub model: String,
    pub aspect_ratio: AspectRatio,
    pub quality: Quality,
    pub reference_images: Vec<String>,
    pub scheduled_date: Option<DateTime<Utc>>,
}

impl NewContentRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            title: String::new(),
            prompt: prompt.into(),
            model: model.into(),
            aspect_ratio: AspectRatio::default(),
            quality: Quality::default(),
            reference_images: Vec::new(),
            scheduled_date: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
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

    pub fn with_references(mut self, references: Vec<String>) -> Self {
        self.reference_images = references;
        self
    }

    pub fn with_scheduled_date(mut self, scheduled_date: DateTime<Utc>) -> Self {
        self.scheduled_date = Some(scheduled_date);
        self
    }
}
