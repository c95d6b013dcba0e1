//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::SettlementConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable holding the signing-service session token.
pub const SESSION_TOKEN_ENV_VAR: &str = "SETTLEMENT_SIGNER_SESSION_TOKEN";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("Environment variable {0} not set")]
    MissingSecret(&'static str),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<SettlementConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<SettlementConfig, ConfigError> {
    let config: SettlementConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Read the signing session token from the environment.
///
/// The token is never logged.
pub fn session_token_from_env() -> Result<String, ConfigError> {
    std::env::var(SESSION_TOKEN_ENV_VAR)
        .ok()
        .filter(|token| !token.is_empty())
        .ok_or(ConfigError::MissingSecret(SESSION_TOKEN_ENV_VAR))
}
