//! OpenAI client tests against a mock HTTP server.

#![allow(clippy::unwrap_used, clippy::panic)]

use ragline::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client(server: &MockServer) -> OpenAI {
    OpenAI::new(
        OpenAIConfig::new("sk-test")
            .with_base_url(format!("{}/v1", server.uri()))
            .with_organization("org-test"),
    )
    .unwrap()
}

mod chat {
    use super::*;

    #[tokio::test]
    async fn sends_messages_and_parses_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(header("openai-organization", "org-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4",
                "messages": [
                    {"role": "system", "content": "You are helpful."},
                    {"role": "user", "content": "Hi"}
                ],
                "user": "U1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "model": "gpt-4-0613",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "Hello!"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = ChatRequest::default()
            .system("You are helpful.")
            .user("Hi")
            .user_id("U1");
        let response = client(&server).await.chat(&request).await.unwrap();

        assert_eq!(response.text(), Some("Hello!"));
        assert_eq!(response.stop_reason, StopReason::Stop);
        assert_eq!(response.model.as_deref(), Some("gpt-4-0613"));
        let usage = response.usage.unwrap();
        assert_eq!(usage.input_tokens, 12);
        assert_eq!(usage.output_tokens, 3);
    }

    #[tokio::test]
    async fn length_stop_is_truncated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {"role": "assistant", "content": "Partial"},
                    "finish_reason": "length"
                }]
            })))
            .mount(&server)
            .await;

        let response = client(&server)
            .await
            .chat(&ChatRequest::new("gpt-4").user("Hi"))
            .await
            .unwrap();
        assert!(response.is_truncated());
    }
}

mod errors {
    use super::*;

    async fn chat_error(status: u16, body: serde_json::Value) -> Error {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&server)
            .await;

        client(&server)
            .await
            .chat(&ChatRequest::new("gpt-4").user("Hi"))
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn unauthorized() {
        let err = chat_error(
            401,
            json!({"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}),
        )
        .await;
        assert!(matches!(err, Error::Llm(LlmError::Auth { .. })));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn rate_limited() {
        let err = chat_error(
            429,
            json!({"error": {"message": "Rate limit reached", "type": "requests"}}),
        )
        .await;
        assert!(matches!(err, Error::Llm(LlmError::RateLimited { .. })));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn context_length() {
        let err = chat_error(
            400,
            json!({"error": {
                "message": "This model's maximum context length is 8192 tokens.",
                "type": "invalid_request_error",
                "code": "context_length_exceeded"
            }}),
        )
        .await;
        assert!(matches!(err, Error::Llm(LlmError::ContextExceeded(_))));
    }

    #[tokio::test]
    async fn unstructured_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .chat(&ChatRequest::new("gpt-4").user("Hi"))
            .await
            .unwrap_err();
        match err {
            Error::Llm(LlmError::HttpStatus { status, ref body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "upstream unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

mod embeddings {
    use super::*;

    #[tokio::test]
    async fn batch_is_returned_in_input_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(body_partial_json(json!({
                "model": "text-embedding-3-small",
                "input": ["first", "second"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": [
                    {"object": "embedding", "index": 1, "embedding": [0.0, 1.0]},
                    {"object": "embedding", "index": 0, "embedding": [1.0, 0.0]}
                ],
                "model": "text-embedding-3-small",
                "usage": {"prompt_tokens": 2, "total_tokens": 2}
            })))
            .mount(&server)
            .await;

        let request = EmbeddingRequest::new("", vec!["first".to_owned(), "second".to_owned()]);
        let response = client(&server).await.embed(&request).await.unwrap();

        assert_eq!(response.usage.unwrap().total_tokens, 2);
        assert_eq!(
            response.into_vectors(),
            vec![vec![1.0, 0.0], vec![0.0, 1.0]]
        );
    }

    #[tokio::test]
    async fn count_mismatch_is_format_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"index": 0, "embedding": [1.0]}]
            })))
            .mount(&server)
            .await;

        let request = EmbeddingRequest::new("m", vec!["a".to_owned(), "b".to_owned()]);
        let err = client(&server).await.embed(&request).await.unwrap_err();
        assert!(matches!(err, Error::Llm(LlmError::ResponseFormat { .. })));
    }
}
