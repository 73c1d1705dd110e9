//! Error types for messaging platform operations.

/// Error type for webhook verification and reply delivery.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum MessagingError {
    /// The webhook request carried no signature header.
    #[error("missing webhook signature header")]
    MissingSignature,

    /// The signature header does not match the request body.
    #[error("webhook signature does not match request body")]
    InvalidSignature,

    /// The webhook body could not be parsed.
    #[error("invalid webhook payload: {0}")]
    Payload(String),

    /// The platform API rejected a request.
    #[error("[{platform}] HTTP {status}: {message}")]
    Api {
        /// Platform name (e.g., "line").
        platform: String,
        /// HTTP status code.
        status: u16,
        /// Top-level error message.
        message: String,
        /// Per-field detail messages, if the platform sent any.
        details: Vec<String>,
    },

    /// Network or connection error.
    #[error("{0}")]
    Network(String),
}

impl MessagingError {
    /// Create an API error without details.
    #[must_use]
    pub fn api(platform: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            platform: platform.into(),
            status,
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Check if this is a retryable error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Network(_) => true,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for MessagingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network("Request timed out".to_owned())
        } else if err.is_connect() {
            Self::Network(format!("Connection failed: {err}"))
        } else {
            Self::Network(err.to_string())
        }
    }
}
