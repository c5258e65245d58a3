// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Trusted log append endpoint.
//!
//! Unauthenticated by design: the caller is an internal collaborator
//! (the driver's external stand-ins), not a user. The run must exist;
//! the append-only invariant means a bad message is rejected before
//! anything is written.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use stratus_core::status::LogLevel;
use stratus_core::store::LogRecord;

use super::AppState;
use crate::error::{ApiError, Result};

#[derive(Deserialize)]
pub(crate) struct AppendLogRequest {
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct AppendLogResponse {
    ok: bool,
    log: LogRecord,
}

/// Append one entry to a run's log stream.
pub(crate) async fn append_log(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
    Json(request): Json<AppendLogRequest>,
) -> Result<Json<AppendLogResponse>> {
    let message = request
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::Validation("Missing log message".into()))?;

    let level = match request.level.as_deref() {
        None | Some("info") => LogLevel::Info,
        Some("error") => LogLevel::Error,
        Some(other) => {
            return Err(ApiError::Validation(format!("Unknown log level: {other}")));
        }
    };

    let log = state.store.append_log(&run_id, level, message).await?;
    Ok(Json(AppendLogResponse { ok: true, log }))
}
