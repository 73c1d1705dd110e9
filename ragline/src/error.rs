//! Unified error types for ragline.
//!
//! This module ties together the failure modes of every stage of the relay:
//! - LLM provider errors (authentication, rate limiting, etc.)
//! - Messaging platform errors (signature checks, reply API failures)
//! - Retrieval index errors

pub use crate::llms::LlmError;
pub use crate::messaging::MessagingError;
pub use crate::retrieval::IndexError;

/// Result type alias for ragline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for ragline.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// LLM provider error.
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Messaging platform error.
    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),

    /// Retrieval index error.
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create a configuration error with a message.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check if retrying the failed operation could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Llm(e) => e.is_retryable(),
            Self::Messaging(e) => e.is_retryable(),
            _ => false,
        }
    }
}
