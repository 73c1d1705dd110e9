//! OpenAI API client implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::chat::ChatRequest;
use crate::error::{LlmError, Result};
use crate::message::Message;

use super::config::OpenAIConfig;
use super::types::{OpenAIChatRequest, OpenAIErrorResponse, OpenAIMessage};

/// Response bodies quoted in errors are cut to this many characters. They
/// can carry user and model text, and errors end up in logs.
const MAX_BODY_EXCERPT_CHARS: usize = 200;

/// OpenAI API client.
#[derive(Debug, Clone)]
pub struct OpenAI {
    pub(crate) config: Arc<OpenAIConfig>,
    pub(crate) client: Client,
}

impl OpenAI {
    /// Create a new OpenAI client with the given configuration.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(LlmError::auth("openai", "API key is required").into());
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        let client = builder
            .build()
            .map_err(|e| LlmError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAIConfig::from_env()?)
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// Get the default chat model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Get the default embedding model.
    #[must_use]
    pub fn embedding_model(&self) -> &str {
        &self.config.embedding_model
    }

    /// Build the chat completions URL.
    pub(crate) fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url())
    }

    /// Build the embeddings URL.
    pub(crate) fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.base_url())
    }

    /// Build an authenticated JSON POST request.
    pub(crate) fn build_request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json");

        if let Some(org) = &self.config.organization {
            req = req.header("OpenAI-Organization", org);
        }

        req
    }

    /// Convert Message to OpenAI format.
    pub(crate) fn convert_message(msg: &Message) -> OpenAIMessage {
        OpenAIMessage {
            role: msg.role.as_str().to_owned(),
            content: msg.content.clone(),
        }
    }

    /// Build the request body.
    pub(crate) fn build_body(&self, request: &ChatRequest) -> OpenAIChatRequest {
        let model = if request.model.is_empty() {
            self.config.model.clone()
        } else {
            request.model.clone()
        };

        OpenAIChatRequest {
            model,
            messages: request.messages.iter().map(Self::convert_message).collect(),
            max_completion_tokens: request.max_completion_tokens,
            temperature: request.temperature,
            user: request.user.clone(),
        }
    }

    /// Parse an error response from OpenAI.
    pub(crate) fn parse_error(status: u16, body: &str) -> LlmError {
        if let Ok(error_response) = serde_json::from_str::<OpenAIErrorResponse>(body) {
            let error = error_response.error;
            let code = error
                .code
                .or(error.error_type)
                .unwrap_or_else(|| status.to_string());

            return match status {
                401 => LlmError::auth("openai", error.message),
                429 => LlmError::rate_limited("openai"),
                400 if error.message.contains("context length")
                    || code == "context_length_exceeded" =>
                {
                    LlmError::context_exceeded(error.message)
                }
                _ => LlmError::provider_code("openai", code, error.message),
            };
        }

        LlmError::http_status(status, body_excerpt(body))
    }

    /// Error for a 2xx body that does not deserialize.
    pub(crate) fn parse_failure(expected: &str, err: &serde_json::Error, body: &str) -> LlmError {
        LlmError::response_format(
            expected,
            format!("parse error: {err}, response: {}", body_excerpt(body)),
        )
    }
}

/// The start of `body`, cut on a char boundary with an ellipsis when longer
/// than [`MAX_BODY_EXCERPT_CHARS`].
pub(crate) fn body_excerpt(body: &str) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(MAX_BODY_EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAI {
        OpenAI::new(OpenAIConfig::new("sk-test").with_base_url("http://localhost:1/v1/"))
            .expect("client")
    }

    #[test]
    fn test_body_excerpt_keeps_short_bodies() {
        assert_eq!(body_excerpt("upstream unavailable"), "upstream unavailable");
    }

    #[test]
    fn test_body_excerpt_cuts_long_bodies() {
        let body = "秘".repeat(MAX_BODY_EXCERPT_CHARS + 50);
        let excerpt = body_excerpt(&body);
        assert_eq!(excerpt.chars().count(), MAX_BODY_EXCERPT_CHARS + 1);
        assert!(excerpt.ends_with('…'));
    }

    #[test]
    fn test_parse_failure_does_not_quote_whole_body() {
        let body = format!("{{\"choices\": \"{}", "user secret ".repeat(100));
        let err = serde_json::from_str::<serde_json::Value>(&body).unwrap_err();
        let LlmError::ResponseFormat { got, .. } = OpenAI::parse_failure("json", &err, &body) else {
            panic!("expected a response format error");
        };
        assert!(got.len() < body.len());
        assert!(got.ends_with('…'));
    }

    #[test]
    fn test_unstructured_error_body_is_cut() {
        let body = "x".repeat(MAX_BODY_EXCERPT_CHARS * 3);
        match OpenAI::parse_error(502, &body) {
            LlmError::HttpStatus { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body.chars().count(), MAX_BODY_EXCERPT_CHARS + 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_key_rejected() {
        let err = OpenAI::new(OpenAIConfig::default()).unwrap_err();
        assert!(matches!(err, crate::Error::Llm(LlmError::Auth { .. })));
    }

    #[test]
    fn test_urls_trim_trailing_slash() {
        let client = client();
        assert_eq!(client.chat_url(), "http://localhost:1/v1/chat/completions");
        assert_eq!(client.embeddings_url(), "http://localhost:1/v1/embeddings");
    }

    #[test]
    fn test_body_uses_default_model() {
        let client = client();
        let body = client.build_body(&ChatRequest::default().user("hi"));
        assert_eq!(body.model, "gpt-4");
        assert_eq!(body.messages[0].role, "user");

        let body = client.build_body(&ChatRequest::new("gpt-4o").user("hi"));
        assert_eq!(body.model, "gpt-4o");
    }

    #[test]
    fn test_parse_error_kinds() {
        let body = r#"{"error":{"message":"Incorrect API key","type":"invalid_request_error","code":"invalid_api_key"}}"#;
        assert!(matches!(
            OpenAI::parse_error(401, body),
            LlmError::Auth { .. }
        ));
        assert!(matches!(
            OpenAI::parse_error(429, body),
            LlmError::RateLimited { .. }
        ));

        let body = r#"{"error":{"message":"This model's maximum context length is 8192 tokens","type":"invalid_request_error","code":"context_length_exceeded"}}"#;
        assert!(matches!(
            OpenAI::parse_error(400, body),
            LlmError::ContextExceeded(_)
        ));

        let body = r#"{"error":{"message":"The model does not exist","type":"invalid_request_error","code":"model_not_found"}}"#;
        match OpenAI::parse_error(404, body) {
            LlmError::Provider { code, .. } => assert_eq!(code.as_deref(), Some("model_not_found")),
            other => panic!("unexpected: {other:?}"),
        }

        assert!(matches!(
            OpenAI::parse_error(502, "<html>bad gateway</html>"),
            LlmError::HttpStatus { status: 502, .. }
        ));
    }
}
