use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::orchestrator::OrchestratorConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8000
}

// ============================================================================
// Repository
// ============================================================================

/// Where content requests are stored.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryBackend {
    #[default]
    Airtable,
    Sqlite,
}

/// Content repository configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RepositoryConfig {
    #[serde(default)]
    pub backend: RepositoryBackend,
    #[serde(default)]
    pub airtable: AirtableConfig,
    #[serde(default)]
    pub sqlite: SqliteConfig,
}

/// Airtable base holding the content calendar
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AirtableConfig {
    /// Personal access token. Also read from `AIRTABLE_PAT`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Base id (`app...`). Also read from `AIRTABLE_BASE_ID`.
    #[serde(default)]
    pub base_id: Option<String>,
    #[serde(default = "default_airtable_table")]
    pub table: String,
    #[serde(default = "default_airtable_api_base")]
    pub api_base: String,
    #[serde(default = "default_airtable_timeout")]
    pub timeout_secs: u64,
}

impl Default for AirtableConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_id: None,
            table: default_airtable_table(),
            api_base: default_airtable_api_base(),
            timeout_secs: default_airtable_timeout(),
        }
    }
}

fn default_airtable_table() -> String {
    "Content Calendar".to_string()
}

fn default_airtable_api_base() -> String {
    "https://api.airtable.com/v0".to_string()
}

fn default_airtable_timeout() -> u64 {
    30
}

/// Local SQLite database
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SqliteConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("lumiere.db")
}

// ============================================================================
// Providers
// ============================================================================

/// Image generation providers
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openrouter: OpenRouterConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    /// Timeout for downloading reference images (seconds)
    #[serde(default = "default_reference_timeout")]
    pub reference_timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openrouter: OpenRouterConfig::default(),
            openai: OpenAiConfig::default(),
            reference_timeout_secs: default_reference_timeout(),
        }
    }
}

fn default_reference_timeout() -> u64 {
    60
}

/// OpenRouter chat-completions endpoint (multimodal image models)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenRouterConfig {
    /// Also read from `OPENROUTER_API_KEY`. Checked at generation time.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_openrouter_api_base")]
    pub api_base: String,
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_openrouter_api_base(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

fn default_openrouter_api_base() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

/// OpenAI images endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAiConfig {
    /// Also read from `OPENAI_API_KEY`. Checked at generation time.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_openai_api_base")]
    pub api_base: String,
    /// Model sent on the wire, whatever id the request resolved to.
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_openai_api_base(),
            model: default_openai_model(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

fn default_openai_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-image-1".to_string()
}

fn default_generation_timeout() -> u64 {
    180
}

// ============================================================================
// Storage
// ============================================================================

/// Artifact storage and public URL layout
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory served under `mount_path`
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,
    /// Subdirectory of `root_dir` receiving new artifacts
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Externally reachable base URL. Also read from `PUBLIC_URL`.
    #[serde(default = "default_public_url")]
    pub public_url: String,
    #[serde(default = "default_mount_path")]
    pub mount_path: String,
    /// Timeout for downloading URL-sourced artifacts (seconds)
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            output_dir: default_output_dir(),
            public_url: default_public_url(),
            mount_path: default_mount_path(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

fn default_root_dir() -> PathBuf {
    PathBuf::from("beta")
}

fn default_output_dir() -> String {
    "to-be-processed".to_string()
}

fn default_public_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_mount_path() -> String {
    "/beta".to_string()
}

fn default_fetch_timeout() -> u64 {
    60
}

// ============================================================================
// Sanitized view
// ============================================================================

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub repository: SanitizedRepositoryConfig,
    pub providers: SanitizedProvidersConfig,
    pub storage: StorageConfig,
    pub orchestrator: OrchestratorConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedRepositoryConfig {
    pub backend: RepositoryBackend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub airtable: Option<SanitizedAirtableConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqlite: Option<SqliteConfig>,
}

/// Airtable config (token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAirtableConfig {
    pub api_key_configured: bool,
    pub base_id: Option<String>,
    pub table: String,
    pub api_base: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedProvidersConfig {
    pub openrouter: SanitizedProviderConfig,
    pub openai: SanitizedProviderConfig,
    pub reference_timeout_secs: u64,
}

/// Provider endpoint (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedProviderConfig {
    pub api_base: String,
    pub api_key_configured: bool,
    pub timeout_secs: u64,
}

fn key_configured(key: &Option<String>) -> bool {
    key.as_ref().is_some_and(|k| !k.is_empty())
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let repository = &config.repository;
        Self {
            server: config.server.clone(),
            repository: SanitizedRepositoryConfig {
                backend: repository.backend,
                airtable: (repository.backend == RepositoryBackend::Airtable).then(|| {
                    SanitizedAirtableConfig {
                        api_key_configured: key_configured(&repository.airtable.api_key),
                        base_id: repository.airtable.base_id.clone(),
                        table: repository.airtable.table.clone(),
                        api_base: repository.airtable.api_base.clone(),
                    }
                }),
                sqlite: (repository.backend == RepositoryBackend::Sqlite)
                    .then(|| repository.sqlite.clone()),
            },
            providers: SanitizedProvidersConfig {
                openrouter: SanitizedProviderConfig {
                    api_base: config.providers.openrouter.api_base.clone(),
                    api_key_configured: key_configured(&config.providers.openrouter.api_key),
                    timeout_secs: config.providers.openrouter.timeout_secs,
                },
                openai: SanitizedProviderConfig {
                    api_base: config.providers.openai.api_base.clone(),
                    api_key_configured: key_configured(&config.providers.openai.api_key),
                    timeout_secs: config.providers.openai.timeout_secs,
                },
                reference_timeout_secs: config.providers.reference_timeout_secs,
            },
            storage: config.storage.clone(),
            orchestrator: config.orchestrator.clone(),
        }
    }
}
