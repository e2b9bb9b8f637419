/// `load_config` module: reads the static YAML config and the credential from the environment.
///
/// The YAML file carries no secrets. The only secret, the provider token, comes from
/// `GITHUB_TOKEN` and is optional.
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{error, info};

use crate::config::Config;

pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(e).with_context(|| format!("Failed to read config file {path_ref:?}"));
        }
    };

    let config: Config = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if config.source.owner.is_empty() || config.source.repo.is_empty() {
        error!(config_path = ?path_ref, "source.owner and source.repo must be set");
        anyhow::bail!("source.owner and source.repo must not be empty");
    }

    config.trace_loaded();
    Ok(config)
}

/// Optional bearer token for the provider; unset or blank means anonymous access.
pub fn github_token() -> Option<String> {
    match std::env::var(TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => {
            info!("{TOKEN_ENV} found in env");
            Some(token.trim().to_string())
        }
        _ => {
            info!("{TOKEN_ENV} not set, using anonymous provider access");
            None
        }
    }
}
