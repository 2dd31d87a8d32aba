//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::security::SigningKey;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file, then read the secret
/// from the environment.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ServiceConfig = toml::from_str(&content)?;
    finish(config, |name| std::env::var(name).ok())
}

/// Defaults plus the secret from the environment, for running without a file.
pub fn from_env_only() -> Result<ServiceConfig, ConfigError> {
    finish(ServiceConfig::default(), |name| std::env::var(name).ok())
}

/// Attach the secret via `lookup` and validate.
pub fn finish<F>(mut config: ServiceConfig, lookup: F) -> Result<ServiceConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    config.proxy.secret = lookup(&config.proxy.secret_env).and_then(SigningKey::new);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
