//! LINE reply client tests against a mock HTTP server.

#![allow(clippy::unwrap_used, clippy::panic)]

use ragline::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> LineClient {
    LineClient::new(LineConfig::new("line-token").with_api_base(server.uri())).unwrap()
}

#[tokio::test]
async fn reply_posts_text_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/bot/message/reply"))
        .and(header("authorization", "Bearer line-token"))
        .and(body_json(json!({
            "replyToken": "rt-1",
            "messages": [
                {"type": "text", "text": "こんにちは"},
                {"type": "text", "text": "second"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .reply("rt-1", &["こんにちは".to_owned(), "second".to_owned()])
        .await
        .unwrap();
}

#[tokio::test]
async fn reply_sink_uses_same_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/bot/message/reply"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let sink: SharedReplySink = std::sync::Arc::new(client(&server));
    assert_eq!(sink.platform(), "line");
    sink.reply("rt", &["hi".to_owned()]).await.unwrap();
}

#[tokio::test]
async fn invalid_reply_token_maps_to_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/bot/message/reply"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "Invalid reply token"})),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .reply("expired", &["hi".to_owned()])
        .await
        .unwrap_err();
    match err {
        Error::Messaging(MessagingError::Api {
            status,
            ref message,
            ..
        }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid reply token");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn server_error_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/bot/message/reply"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&server)
        .await;

    let err = client(&server)
        .reply("rt", &["hi".to_owned()])
        .await
        .unwrap_err();
    assert!(err.is_retryable());
}
