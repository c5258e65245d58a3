// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Stateless proxy to a chat completion upstream.
//!
//! The server adds credentials and a default model, forwards the
//! caller's messages, and returns the upstream body untouched. No
//! conversation state is kept.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{ApiError, Result};

/// One chat message in the upstream's wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role (`system`, `user`, `assistant`).
    pub role: String,
    /// Message text.
    pub content: String,
}

/// Client request body for the chat proxy.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Conversation so far; must be non-empty.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Model override.
    #[serde(default)]
    pub model: Option<String>,
    /// Token budget override.
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct UpstreamRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Chat completion upstream client.
#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    default_model: String,
}

impl ChatClient {
    /// Create a client; `api_key = None` makes every call 501.
    pub fn new(api_url: impl Into<String>, api_key: Option<String>, default_model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key,
            default_model: default_model.into(),
        }
    }

    /// Forward one completion request and return the upstream JSON.
    pub async fn complete(&self, request: &ChatRequest) -> Result<Value> {
        let Some(api_key) = &self.api_key else {
            return Err(ApiError::ChatNotConfigured);
        };
        if request.messages.is_empty() {
            return Err(ApiError::Validation("messages must not be empty".into()));
        }

        let model = request.model.as_deref().unwrap_or(&self.default_model);
        let body = UpstreamRequest {
            model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "chat upstream unreachable");
                ApiError::Upstream(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(status = %status, "chat upstream rejected request");
            return Err(ApiError::Upstream(format!(
                "upstream returned {status}: {detail}"
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ApiError::Upstream(e.to_string()))
    }
}
