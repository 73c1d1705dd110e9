//! OpenAI client configuration.

use crate::error::{LlmError, Result};

/// Configuration for the OpenAI client.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Base URL for the API (defaults to OpenAI's API).
    pub base_url: String,
    /// Default chat model.
    pub model: String,
    /// Default embedding model.
    pub embedding_model: String,
    /// Optional organization ID.
    pub organization: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl OpenAIConfig {
    /// Default OpenAI API base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
    /// Default chat model.
    pub const DEFAULT_MODEL: &'static str = "gpt-4";
    /// Default embedding model.
    pub const DEFAULT_EMBEDDING_MODEL: &'static str = "text-embedding-3-small";
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// Creates a new configuration with the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Reads from:
    /// - `OPENAI_API_KEY` - Required API key
    /// - `OPENAI_BASE_URL` - Optional base URL
    /// - `OPENAI_MODEL` - Optional default chat model
    /// - `OPENAI_EMBEDDING_MODEL` - Optional default embedding model
    /// - `OPENAI_ORGANIZATION` - Optional organization ID
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| LlmError::auth("openai", "OPENAI_API_KEY environment variable not set"))?;

        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            config.model = model;
        }
        if let Ok(model) = std::env::var("OPENAI_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        config.organization = std::env::var("OPENAI_ORGANIZATION").ok();

        Ok(config)
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the default chat model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the default embedding model.
    #[must_use]
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Sets the organization ID.
    #[must_use]
    pub fn with_organization(mut self, org: impl Into<String>) -> Self {
        self.organization = Some(org.into());
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
            model: Self::DEFAULT_MODEL.to_owned(),
            embedding_model: Self::DEFAULT_EMBEDDING_MODEL.to_owned(),
            organization: None,
            timeout_secs: Some(Self::DEFAULT_TIMEOUT_SECS),
        }
    }
}
