//! Chat types and the provider trait for completion calls.
//!
//! This module provides:
//! - [`ChatRequest`]: Request parameters for chat completions
//! - [`ChatResponse`]: Response from chat completions
//! - [`ChatProvider`]: Core trait for LLM providers
//!
//! # Example
//!
//! ```rust,ignore
//! use ragline::prelude::*;
//!
//! let request = ChatRequest::new("gpt-4")
//!     .system("You are helpful.")
//!     .user("Hello!")
//!     .temperature(0.7);
//!
//! let response = provider.chat(&request).await?;
//! println!("{}", response.text().unwrap_or_default());
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;
use crate::usage::Usage;

/// A chat completion request to an LLM.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier. Empty means the provider's default model.
    #[serde(default)]
    pub model: String,

    /// Conversation messages.
    #[serde(default)]
    pub messages: Vec<Message>,

    /// Maximum completion tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,

    /// Sampling temperature (0.0 to 2.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// End-user identifier for tracking and abuse detection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl ChatRequest {
    /// Creates a new request with the specified model.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Adds a system message.
    #[must_use]
    pub fn system(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::system(content));
        self
    }

    /// Adds a user message.
    #[must_use]
    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    /// Adds a message.
    #[must_use]
    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Sets max completion tokens.
    #[must_use]
    pub const fn max_completion_tokens(mut self, tokens: u32) -> Self {
        self.max_completion_tokens = Some(tokens);
        self
    }

    /// Sets temperature.
    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the end-user identifier.
    #[must_use]
    pub fn user_id(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of the answer.
    #[default]
    Stop,
    /// Hit the token limit.
    Length,
    /// Removed by the provider's content filter.
    ContentFilter,
}

impl StopReason {
    /// Map an OpenAI-style `finish_reason`. Unknown values count as `Stop`.
    #[must_use]
    pub fn from_finish_reason(reason: Option<&str>) -> Self {
        match reason {
            Some("length") => Self::Length,
            Some("content_filter") => Self::ContentFilter,
            _ => Self::Stop,
        }
    }
}

/// A chat completion response from an LLM.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The generated message.
    pub message: Message,

    /// Why the model stopped generating.
    pub stop_reason: StopReason,

    /// Token usage statistics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Model identifier used for this response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Unique completion ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ChatResponse {
    /// Creates a response from text content.
    #[must_use]
    pub fn from_text(content: impl Into<String>) -> Self {
        Self {
            message: Message::assistant(content),
            ..Default::default()
        }
    }

    /// Returns the text content of the response.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.message.text()
    }

    /// Returns `true` if the response was truncated due to length.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.stop_reason == StopReason::Length
    }
}

/// Trait for providers that support chat completions.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send a chat completion request and receive a complete response.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// Short provider name used in logs.
    fn provider_name(&self) -> &'static str;

    /// Model used when a request leaves `model` empty.
    fn default_model(&self) -> &str;
}

/// A chat provider shared across request handlers.
pub type SharedChatProvider = Arc<dyn ChatProvider>;
