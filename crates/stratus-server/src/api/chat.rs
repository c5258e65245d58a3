// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Chat completion passthrough.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde_json::Value;

use super::AppState;
use crate::chat::ChatRequest;
use crate::error::Result;

/// Forward a completion request to the configured upstream.
pub(crate) async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Value>> {
    let completion = state.chat.complete(&request).await?;
    Ok(Json(completion))
}
