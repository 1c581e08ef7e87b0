//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `blockchain.rpc_url`.
pub const RPC_URL_ENV: &str = "RPC_URL";
/// Environment variable overriding `contracts.qna`.
pub const QNA_CONTRACT_ENV: &str = "CONTRACT_ADDRESS";
/// Environment variable overriding `contracts.token`.
pub const TOKEN_CONTRACT_ENV: &str = "BRAIN_TOKEN_ADDRESS";
/// Environment variable overriding `contracts.swap`.
pub const SWAP_CONTRACT_ENV: &str = "BRAIN_SWAP_ADDRESS";
/// Environment variable overriding `admin.api_key`.
pub const ADMIN_KEY_ENV: &str = "RELAY_ADMIN_API_KEY";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration, apply process environment overrides, and validate.
///
/// Without a path, defaults are used and the environment must supply every
/// endpoint and address.
pub fn load_config(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    let config = match path {
        Some(path) => parse_file(path)?,
        None => RelayConfig::default(),
    };
    let config = apply_env_overrides(config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn parse_file(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Overlay environment values on top of the file configuration.
///
/// Empty values are ignored so an unset-but-exported variable cannot blank
/// out a value from the file.
pub fn apply_env_overrides<F>(mut config: RelayConfig, lookup: F) -> RelayConfig
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get(RPC_URL_ENV) {
        config.blockchain.rpc_url = v;
    }
    if let Some(v) = get(QNA_CONTRACT_ENV) {
        config.contracts.qna = v;
    }
    if let Some(v) = get(TOKEN_CONTRACT_ENV) {
        config.contracts.token = v;
    }
    if let Some(v) = get(SWAP_CONTRACT_ENV) {
        config.contracts.swap = v;
    }
    if let Some(v) = get(ADMIN_KEY_ENV) {
        config.admin.api_key = v;
    }
    config
}
