use super::{types::Config, ConfigError, RepositoryBackend};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Sweep interval is not 0
/// - Airtable backend has a base id
/// - Storage root is set
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.orchestrator.sweep_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.sweep_interval_secs cannot be 0".to_string(),
        ));
    }

    if config.repository.backend == RepositoryBackend::Airtable
        && config
            .repository
            .airtable
            .base_id
            .as_deref()
            .is_none_or(str::is_empty)
    {
        return Err(ConfigError::ValidationError(
            "repository.airtable.base_id is required for the airtable backend (or set AIRTABLE_BASE_ID)"
                .to_string(),
        ));
    }

    if config.storage.root_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "storage.root_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}
