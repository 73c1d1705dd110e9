//! Configuration management for ragline.
//!
//! Settings are layered, later layers winning:
//! 1. Default values
//! 2. Config file (`~/.ragline/config.toml`, `--config` or `RAGLINE_CONFIG`)
//! 3. Environment variables (after `.env` is loaded)
//! 4. Command-line flags, applied by the binary

mod schema;

pub use schema::{
    BotConfig, ConfigIssue, IssueLevel, LineSection, OpenAISection, PersonaSection, RelaySection,
    RetrievalSection, ServerSection,
};

use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Error type for configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    /// TOML serialization error.
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Get the default config directory path.
#[must_use]
pub fn default_config_dir() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ragline")
}

/// Get the default config file path.
#[must_use]
pub fn config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Load configuration from a file, falling back to defaults if it is absent.
pub async fn load_config_from(path: &Path) -> ConfigResult<BotConfig> {
    if !path.exists() {
        info!(path = %path.display(), "config file not found, using defaults");
        return Ok(BotConfig::default());
    }

    let content = tokio::fs::read_to_string(path).await?;
    let config: BotConfig = toml::from_str(&content)?;
    debug!(path = %path.display(), "loaded config file");

    Ok(config)
}

/// Load the file layer (explicit path or default) and merge the environment.
pub async fn load_layered(path: Option<&Path>) -> ConfigResult<BotConfig> {
    let default_path = config_path();
    let path = path.unwrap_or(&default_path);
    Ok(load_config_from(path).await?.with_env())
}

/// Save configuration to a specific path.
pub async fn save_config_to(config: &BotConfig, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let content = toml::to_string_pretty(config)?;
    tokio::fs::write(path, content).await?;
    info!(path = %path.display(), "saved config file");

    Ok(())
}

/// Write a default config file at `path`.
///
/// An existing file is kept unless `force` is set. Returns true if a file
/// was written.
pub async fn init_config(path: &Path, force: bool) -> ConfigResult<bool> {
    if path.exists() && !force {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent.join("data")).await?;
    }

    let mut config = BotConfig::default();
    config.retrieval.index_path = path.parent().map(|p| p.join("data").join("index.json"));
    save_config_to(&config, path).await?;
    Ok(true)
}
