//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

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

/// Build the runtime configuration: optional file, then process environment.
pub fn load(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    load_with_env(path, |key| std::env::var(key).ok())
}

/// [`load`] with an injected environment lookup.
pub fn load_with_env<F>(path: Option<&Path>, lookup: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, lookup);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply `PORT`, `BACKEND_URL` (and the legacy `API_URL`) on top of `config`.
///
/// The lookup is injected so tests never touch the process environment.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT").filter(|p| !p.trim().is_empty()) {
        config.listener.bind_address = format!("0.0.0.0:{}", port.trim());
    }

    let backend = lookup("BACKEND_URL")
        .or_else(|| lookup("API_URL"))
        .filter(|u| !u.trim().is_empty());
    if let Some(url) = backend {
        config.backend.url = url.trim().trim_end_matches('/').to_string();
    }
}
