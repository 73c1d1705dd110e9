//! LINE reply API client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::messaging::{MessagingError, ReplySink};

use super::config::LineConfig;

const PLATFORM: &str = "line";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: Vec<TextBody<'a>>,
}

#[derive(Debug, Serialize)]
struct TextBody<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    property: Option<String>,
}

/// Client for the LINE Messaging API reply endpoint.
#[derive(Debug, Clone)]
pub struct LineClient {
    config: Arc<LineConfig>,
    client: Client,
}

impl LineClient {
    /// Create a new client. Fails if the access token is empty.
    pub fn new(config: LineConfig) -> Result<Self> {
        if config.channel_access_token.is_empty() {
            return Err(Error::config("LINE channel access token is required"));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }
        let client = builder.build()?;

        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(LineConfig::from_env()?)
    }

    /// Channel configuration.
    #[must_use]
    pub fn config(&self) -> &LineConfig {
        &self.config
    }

    fn reply_url(&self) -> String {
        format!(
            "{}/v2/bot/message/reply",
            self.config.api_base.trim_end_matches('/')
        )
    }

    /// Send text messages in reply to an event.
    ///
    /// A reply token is single-use and expires shortly after the event, so
    /// this makes exactly one attempt.
    pub async fn reply(&self, reply_token: &str, texts: &[String]) -> Result<()> {
        let body = ReplyRequest {
            reply_token,
            messages: texts
                .iter()
                .map(|text| TextBody { kind: "text", text })
                .collect(),
        };
        debug!(messages = texts.len(), "sending LINE reply");

        let response = self
            .client
            .post(self.reply_url())
            .bearer_auth(&self.config.channel_access_token)
            .json(&body)
            .send()
            .await
            .map_err(MessagingError::from)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::parse_error(status.as_u16(), &error_text).into());
        }

        Ok(())
    }

    /// Parse an error response from the LINE API.
    fn parse_error(status: u16, body: &str) -> MessagingError {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => MessagingError::Api {
                platform: PLATFORM.to_owned(),
                status,
                message: parsed.message,
                details: parsed
                    .details
                    .into_iter()
                    .map(|d| match d.property {
                        Some(property) => format!("{property}: {}", d.message),
                        None => d.message,
                    })
                    .collect(),
            },
            Err(_) => MessagingError::api(PLATFORM, status, body),
        }
    }
}

#[async_trait]
impl ReplySink for LineClient {
    async fn reply(&self, reply_token: &str, texts: &[String]) -> Result<()> {
        Self::reply(self, reply_token, texts).await
    }

    fn platform(&self) -> &'static str {
        PLATFORM
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_rejected() {
        assert!(matches!(LineClient::new(LineConfig::new("")), Err(Error::Config(_))));
    }

    #[test]
    fn reply_url_trims_slash() {
        let client =
            LineClient::new(LineConfig::new("token").with_api_base("http://localhost:1/")).unwrap();
        assert_eq!(client.reply_url(), "http://localhost:1/v2/bot/message/reply");
    }

    #[test]
    fn request_body_shape() {
        let texts = vec!["hello".to_owned()];
        let body = ReplyRequest {
            reply_token: "rt",
            messages: texts.iter().map(|text| TextBody { kind: "text", text }).collect(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"replyToken": "rt", "messages": [{"type": "text", "text": "hello"}]})
        );
    }

    #[test]
    fn parse_structured_error() {
        let body = r#"{"message":"The request body has 1 error(s)",
            "details":[{"message":"May not be empty","property":"messages[0].text"}]}"#;
        match LineClient::parse_error(400, body) {
            MessagingError::Api {
                status,
                message,
                details,
                ..
            } => {
                assert_eq!(status, 400);
                assert_eq!(message, "The request body has 1 error(s)");
                assert_eq!(details, vec!["messages[0].text: May not be empty".to_owned()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_unstructured_error() {
        let err = LineClient::parse_error(502, "Bad Gateway");
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "[line] HTTP 502: Bad Gateway");
    }
}
