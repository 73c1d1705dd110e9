//! OpenAI ChatProvider implementation.

use async_trait::async_trait;
use tracing::debug;

use crate::chat::{ChatProvider, ChatRequest, ChatResponse, StopReason};
use crate::error::{LlmError, Result};
use crate::message::{Message, Role};

use super::client::OpenAI;
use super::types::OpenAIChatResponse;

impl OpenAI {
    /// Parse the response into ChatResponse.
    pub(crate) fn parse_response(response: OpenAIChatResponse) -> Result<ChatResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::response_format("at least one choice", "empty choices"))?;

        let stop_reason = StopReason::from_finish_reason(choice.finish_reason.as_deref());

        Ok(ChatResponse {
            message: Message {
                role: Role::Assistant,
                content: choice.message.content,
            },
            stop_reason,
            usage: response.usage,
            model: response.model,
            id: response.id,
        })
    }
}

#[async_trait]
impl ChatProvider for OpenAI {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = self.chat_url();
        let body = self.build_body(request);
        debug!(model = %body.model, messages = body.messages.len(), "sending chat completion");

        let response = self
            .build_request(&url)
            .json(&body)
            .send()
            .await
            .map_err(LlmError::from)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::parse_error(status.as_u16(), &error_text).into());
        }

        let response_text = response.text().await.map_err(LlmError::from)?;
        let parsed: OpenAIChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| Self::parse_failure("valid OpenAI response", &e, &response_text))?;

        Self::parse_response(parsed)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }

    fn default_model(&self) -> &str {
        self.model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llms::openai::types::{OpenAIChoice, OpenAIMessage};

    #[test]
    fn test_parse_response_takes_first_choice() {
        let response = OpenAIChatResponse {
            id: Some("chatcmpl-1".to_owned()),
            model: Some("gpt-4".to_owned()),
            choices: vec![OpenAIChoice {
                message: OpenAIMessage {
                    role: "assistant".to_owned(),
                    content: Some("こんにちは".to_owned()),
                },
                finish_reason: Some("length".to_owned()),
            }],
            usage: None,
        };

        let parsed = OpenAI::parse_response(response).unwrap();
        assert_eq!(parsed.text(), Some("こんにちは"));
        assert!(parsed.is_truncated());
        assert_eq!(parsed.id.as_deref(), Some("chatcmpl-1"));
    }

    #[test]
    fn test_parse_response_without_choices() {
        let response = OpenAIChatResponse {
            id: None,
            model: None,
            choices: vec![],
            usage: None,
        };

        let err = OpenAI::parse_response(response).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Llm(LlmError::ResponseFormat { .. })
        ));
    }
}
