//! File system artifact store.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use reqwest::Client;
use sha2::{Digest, Sha256};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::error::ArtifactError;
use super::naming::{artifact_stem, cell_stem, disambiguated};
use super::traits::ArtifactStore;
use super::types::{Artifact, ArtifactMetadata, ArtifactSource};
use crate::config::StorageConfig;
use crate::generation::GenerationRequest;
use crate::metrics;

const EXTENSION: &str = "png";

/// Collision attempts before giving up on a name.
const MAX_SUFFIX: u32 = 10_000;

/// Stores artifacts as files under `<root_dir>/<output_dir>`.
pub struct FsArtifactStore {
    root_dir: PathBuf,
    output_dir: String,
    base_url: String,
    client: Client,
}

impl FsArtifactStore {
    pub fn new(config: &StorageConfig) -> Result<Self, ArtifactError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()?;

        let mount = config.mount_path.trim_matches('/');
        let public = config.public_url.trim_end_matches('/');
        let base_url = if mount.is_empty() {
            public.to_string()
        } else {
            format!("{}/{}", public, mount)
        };

        Ok(Self {
            root_dir: config.root_dir.clone(),
            output_dir: config.output_dir.trim_matches('/').to_string(),
            base_url,
            client,
        })
    }

    /// Directory new artifacts are written to.
    pub fn output_path(&self) -> PathBuf {
        self.root_dir.join(&self.output_dir)
    }

    fn relative_path(&self, file_name: &str) -> String {
        if self.output_dir.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", self.output_dir, file_name)
        }
    }

    /// Public URL for a path relative to the storage root.
    pub fn public_url(&self, relative_path: &str) -> String {
        format!("{}/{}", self.base_url, relative_path)
    }

    /// Resolve a source to raw bytes.
    async fn load_bytes(&self, source: ArtifactSource) -> Result<Vec<u8>, ArtifactError> {
        let bytes = match source {
            ArtifactSource::Base64(payload) => decode_base64(&payload)?,
            ArtifactSource::DataUri(uri) => {
                let (header, payload) = uri
                    .split_once(',')
                    .ok_or_else(|| ArtifactError::Decode("data URI has no payload".to_string()))?;
                if !header.ends_with(";base64") {
                    return Err(ArtifactError::Decode(format!(
                        "unsupported data URI encoding: {}",
                        header
                    )));
                }
                decode_base64(payload)?
            }
            ArtifactSource::Url(url) => self.download(&url).await?,
        };

        if bytes.is_empty() {
            return Err(ArtifactError::EmptyPayload);
        }
        Ok(bytes)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ArtifactError> {
        debug!("Downloading artifact from {}", url);

        let fetch_error = |message: String| ArtifactError::Fetch {
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {}", status.as_u16())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    /// Write `bytes` to the first free name derived from `stem`, starting at
    /// suffix `first_attempt`. Returns the suffix that was taken.
    ///
    /// Files are opened with create-new semantics, so an existing artifact is
    /// never replaced. A failed write removes the partial file.
    async fn write_unique(
        &self,
        stem: &str,
        bytes: &[u8],
        first_attempt: u32,
    ) -> Result<(u32, String, PathBuf), ArtifactError> {
        let dir = self.output_path();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| ArtifactError::write(dir.clone(), e))?;

        for attempt in first_attempt..=MAX_SUFFIX {
            let file_name = disambiguated(stem, EXTENSION, attempt);
            let path = dir.join(&file_name);

            match write_new(&path, bytes).await {
                Ok(()) => return Ok((attempt, file_name, path)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    debug!("{} exists, trying next suffix", file_name);
                }
                Err(e) => return Err(ArtifactError::write(path, e)),
            }
        }

        Err(ArtifactError::write(
            dir.join(disambiguated(stem, EXTENSION, MAX_SUFFIX)),
            std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "no free file name for artifact",
            ),
        ))
    }

    /// Write the image and its sidecar under one free stem.
    ///
    /// A name is only taken when both `<name>.png` and `<name>.json` are free.
    /// If the sidecar cannot be written the image is removed again.
    async fn materialize_at(
        &self,
        source: ArtifactSource,
        request: &GenerationRequest,
        created_at: DateTime<Utc>,
    ) -> Result<Artifact, ArtifactError> {
        let kind = source.kind();
        let bytes = self.load_bytes(source).await?;

        let metadata = ArtifactMetadata {
            prompt: request.prompt.clone(),
            model: request.model.clone(),
            refs: request.references.clone(),
            aspect: request.aspect_ratio,
            quality: request.quality,
            created_at,
            sha256: sha256_hex(&bytes),
            size: bytes.len() as u64,
        };
        let json = serde_json::to_vec_pretty(&metadata)
            .map_err(|e| ArtifactError::Metadata(e.to_string()))?;

        let stem = artifact_stem(created_at, &request.model, &request.prompt);
        let mut next_attempt = 0;
        let artifact = loop {
            let (taken, file_name, path) = self.write_unique(&stem, &bytes, next_attempt).await?;
            let metadata_path = path.with_extension("json");

            match write_new(&metadata_path, &json).await {
                Ok(()) => {
                    let mut artifact = self.build_artifact(file_name, path, &bytes, created_at);
                    artifact.metadata_path = Some(metadata_path);
                    break artifact;
                }
                Err(e) => {
                    remove_orphan(&path).await;
                    if e.kind() == std::io::ErrorKind::AlreadyExists {
                        debug!("{} exists, trying next suffix", metadata_path.display());
                        next_attempt = taken + 1;
                        continue;
                    }
                    return Err(ArtifactError::Metadata(format!(
                        "{}: {}",
                        metadata_path.display(),
                        e
                    )));
                }
            }
        };

        metrics::ARTIFACTS_WRITTEN.inc();
        info!(
            "Saved {} artifact {} ({} bytes)",
            kind, artifact.relative_path, artifact.size_bytes
        );

        Ok(artifact)
    }

    fn build_artifact(
        &self,
        file_name: String,
        path: PathBuf,
        bytes: &[u8],
        created_at: DateTime<Utc>,
    ) -> Artifact {
        let relative_path = self.relative_path(&file_name);
        Artifact {
            locator: self.public_url(&relative_path),
            relative_path,
            file_name,
            path,
            metadata_path: None,
            size_bytes: bytes.len() as u64,
            sha256: sha256_hex(bytes),
            created_at,
        }
    }
}

fn decode_base64(payload: &str) -> Result<Vec<u8>, ArtifactError> {
    STANDARD
        .decode(payload.trim())
        .map_err(|e| ArtifactError::Decode(e.to_string()))
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Create `path` (failing if it exists) and write `bytes` to it.
/// A failed write removes the partial file.
async fn write_new(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;

    let written = async {
        file.write_all(bytes).await?;
        file.sync_all().await
    }
    .await;

    if written.is_err() {
        drop(file);
        remove_orphan(path).await;
    }
    written
}

async fn remove_orphan(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        warn!("Failed to remove partial artifact {}: {}", path.display(), e);
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    fn name(&self) -> &str {
        "fs"
    }

    async fn materialize(
        &self,
        source: ArtifactSource,
        request: &GenerationRequest,
    ) -> Result<Artifact, ArtifactError> {
        self.materialize_at(source, request, Utc::now()).await
    }

    async fn materialize_cell(
        &self,
        source: ArtifactSource,
        base_name: &str,
        index: usize,
    ) -> Result<Artifact, ArtifactError> {
        let bytes = self.load_bytes(source).await?;

        let created_at = Utc::now();
        let (_, file_name, path) = self
            .write_unique(&cell_stem(base_name, index), &bytes, 0)
            .await?;
        let artifact = self.build_artifact(file_name, path, &bytes, created_at);

        metrics::ARTIFACTS_WRITTEN.inc();
        debug!("Saved grid cell {}", artifact.relative_path);

        Ok(artifact)
    }
}
