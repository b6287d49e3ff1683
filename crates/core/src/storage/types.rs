//! Types for the artifact store.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::{AspectRatio, Quality};

/// Image payload as returned by a provider, before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    /// Bare base64 text.
    Base64(String),
    /// `data:<mime>;base64,<payload>` URI.
    DataUri(String),
    /// Remote image that must be downloaded.
    Url(String),
}

impl ArtifactSource {
    /// Classify a provider string by its shape.
    pub fn from_encoded(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.starts_with("data:") {
            Self::DataUri(value)
        } else if value.starts_with("http://") || value.starts_with("https://") {
            Self::Url(value)
        } else {
            Self::Base64(value)
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Base64(_) => "base64",
            Self::DataUri(_) => "data_uri",
            Self::Url(_) => "url",
        }
    }
}

/// A persisted generation output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    /// File name inside the output directory.
    pub file_name: String,
    /// Path relative to the storage root (`to-be-processed/<file>`).
    pub relative_path: String,
    /// Absolute or root-joined path on disk.
    pub path: PathBuf,
    /// Public locator under the storage mount.
    pub locator: String,
    /// Sidecar metadata path, absent for grid cells.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_path: Option<PathBuf>,
    pub size_bytes: u64,
    pub sha256: String,
    pub created_at: DateTime<Utc>,
}

/// Sidecar record stored next to an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetadata {
    pub prompt: String,
    pub model: String,
    pub refs: Vec<String>,
    pub aspect: AspectRatio,
    pub quality: Quality,
    pub created_at: DateTime<Utc>,
    pub sha256: String,
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_encoded_shapes() {
        assert_eq!(
            ArtifactSource::from_encoded("data:image/png;base64,AAAA").kind(),
            "data_uri"
        );
        assert_eq!(
            ArtifactSource::from_encoded("https://cdn.example.com/x.png").kind(),
            "url"
        );
        assert_eq!(ArtifactSource::from_encoded("iVBORw0KGgo=").kind(), "base64");
    }

    #[test]
    fn test_metadata_field_names() {
        let metadata = ArtifactMetadata {
            prompt: "fox".to_string(),
            model: "black-forest-labs/flux.2-pro".to_string(),
            refs: vec![],
            aspect: AspectRatio::Landscape,
            quality: Quality::High,
            created_at: Utc::now(),
            sha256: "abc".to_string(),
            size: 3,
        };
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["aspect"], "16:9");
        assert_eq!(json["quality"], "high");
        assert!(json.get("createdAt").is_some());
    }
}
