use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Well-known credential variables and the config keys they fill.
const CREDENTIAL_VARS: &[(&str, &str)] = &[
    ("OPENROUTER_API_KEY", "providers.openrouter.api_key"),
    ("OPENAI_API_KEY", "providers.openai.api_key"),
    ("AIRTABLE_PAT", "repository.airtable.api_key"),
    ("AIRTABLE_BASE_ID", "repository.airtable.base_id"),
    ("PUBLIC_URL", "storage.public_url"),
];

fn credential_env() -> Env {
    let names: Vec<&str> = CREDENTIAL_VARS.iter().map(|(var, _)| *var).collect();
    Env::raw().only(&names).map(|key| {
        CREDENTIAL_VARS
            .iter()
            .find(|(var, _)| key == *var)
            .map(|(_, path)| (*path).into())
            .unwrap_or_else(|| key.as_str().to_string().into())
    })
}

/// Load configuration from file with environment variable overrides.
///
/// Precedence, lowest first: the TOML file, the well-known credential
/// variables, then `LUMIERE_` variables (`LUMIERE_SERVER__PORT=9000`).
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(credential_env())
        .merge(Env::prefixed("LUMIERE_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
