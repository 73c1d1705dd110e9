//! LINE channel configuration.

use crate::error::{Error, Result};

/// Credentials and endpoints for one LINE Messaging API channel.
#[derive(Debug, Clone)]
pub struct LineConfig {
    /// Long-lived channel access token used for the reply API.
    pub channel_access_token: String,
    /// Channel secret used to verify webhook signatures.
    pub channel_secret: Option<String>,
    /// API base URL.
    pub api_base: String,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl LineConfig {
    /// Default LINE API base URL.
    pub const DEFAULT_API_BASE: &'static str = "https://api.line.me";
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Creates a configuration with the given channel access token.
    #[must_use]
    pub fn new(channel_access_token: impl Into<String>) -> Self {
        Self {
            channel_access_token: channel_access_token.into(),
            channel_secret: None,
            api_base: Self::DEFAULT_API_BASE.to_owned(),
            timeout_secs: Some(Self::DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Reads from:
    /// - `LINE_CHANNEL_ACCESS_TOKEN` - Required access token
    /// - `LINE_CHANNEL_SECRET` - Optional channel secret
    /// - `LINE_API_BASE` - Optional API base URL
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("LINE_CHANNEL_ACCESS_TOKEN")
            .map_err(|_| Error::config("LINE_CHANNEL_ACCESS_TOKEN environment variable not set"))?;

        let mut config = Self::new(token);
        config.channel_secret = std::env::var("LINE_CHANNEL_SECRET")
            .ok()
            .filter(|s| !s.is_empty());
        if let Ok(base) = std::env::var("LINE_API_BASE") {
            config.api_base = base;
        }
        Ok(config)
    }

    /// Sets the channel secret.
    #[must_use]
    pub fn with_channel_secret(mut self, secret: impl Into<String>) -> Self {
        self.channel_secret = Some(secret.into());
        self
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}
