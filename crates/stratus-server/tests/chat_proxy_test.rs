// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tests for the chat completion passthrough against a mock upstream.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stratus_server::chat::{ChatClient, ChatMessage, ChatRequest};
use stratus_server::error::ApiError;

fn request(messages: Vec<ChatMessage>) -> ChatRequest {
    ChatRequest {
        messages,
        model: None,
        max_tokens: None,
    }
}

fn user_message(content: &str) -> ChatMessage {
    ChatMessage {
        role: "user".to_string(),
        content: content.to_string(),
    }
}

#[tokio::test]
async fn completion_is_passed_through_unchanged() {
    let server = MockServer::start().await;
    let upstream_body = json!({
        "id": "cmpl-1",
        "choices": [{ "message": { "role": "assistant", "content": "hello" } }]
    });
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer secret-key"))
        .and(body_partial_json(json!({ "model": "test-model" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(upstream_body.clone()))
        .mount(&server)
        .await;

    let client = ChatClient::new(
        format!("{}/v1/chat/completions", server.uri()),
        Some("secret-key".to_string()),
        "test-model",
    );
    let completion = client.complete(&request(vec![user_message("hi")])).await.unwrap();
    assert_eq!(completion, upstream_body);
}

#[tokio::test]
async fn client_model_override_wins() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "model": "bigger-model" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "cmpl-2" })))
        .mount(&server)
        .await;

    let client = ChatClient::new(
        format!("{}/v1/chat/completions", server.uri()),
        Some("secret-key".to_string()),
        "test-model",
    );
    let req = ChatRequest {
        messages: vec![user_message("hi")],
        model: Some("bigger-model".to_string()),
        max_tokens: Some(64),
    };
    client.complete(&req).await.unwrap();
}

#[tokio::test]
async fn upstream_failure_maps_to_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let client = ChatClient::new(
        format!("{}/v1/chat/completions", server.uri()),
        Some("secret-key".to_string()),
        "test-model",
    );
    let err = client
        .complete(&request(vec![user_message("hi")]))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Upstream(_)));
}

#[tokio::test]
async fn unreachable_upstream_maps_to_upstream_error() {
    let client = ChatClient::new(
        "http://127.0.0.1:1/v1/chat/completions",
        Some("secret-key".to_string()),
        "test-model",
    );
    let err = client
        .complete(&request(vec![user_message("hi")]))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Upstream(_)));
}
