//! Error type for the bot binary.

use crate::config::ConfigError;

/// Result type alias for bot operations.
pub type Result<T> = std::result::Result<T, BotError>;

/// Errors surfaced by CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Config file could not be read or written.
    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    /// Error from the relay library.
    #[error(transparent)]
    Ragline(#[from] ragline::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BotError {
    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
