//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ServerConfig;
use crate::config::validation::validate_config;
use crate::error::ConfigError;

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: ServerConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
