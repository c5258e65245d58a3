// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Run status and log reads.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use stratus_core::store::{LogRecord, ProjectRecord, RunRecord};

use super::{AppState, require_user};
use crate::auth::AuthUser;
use crate::error::{ApiError, Result};

#[derive(Deserialize)]
pub(crate) struct RunListQuery {
    #[serde(default)]
    project_id: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct RunListResponse {
    runs: Vec<RunRecord>,
}

#[derive(Serialize)]
pub(crate) struct RunDetailResponse {
    run: RunRecord,
    logs: Vec<LogRecord>,
}

/// List runs for one of the caller's projects, newest first.
pub(crate) async fn list_runs(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<RunListQuery>,
) -> Result<Json<RunListResponse>> {
    let user = require_user(&state, &headers).await?;

    let project_id = query
        .project_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::Validation("Missing project_id query parameter".into()))?;

    let project = state
        .store
        .get_project(&project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Project not found: {project_id}")))?;
    ensure_owner(&project, &user)?;

    let runs = state.store.list_runs(&project.id).await?;
    Ok(Json(RunListResponse { runs }))
}

/// Run detail with its full log stream.
pub(crate) async fn get_run(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(run_id): Path<String>,
) -> Result<Json<RunDetailResponse>> {
    let user = require_user(&state, &headers).await?;

    let run = state
        .registry
        .get(&run_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Run not found: {run_id}")))?;

    // Ownership is checked before any run or log data is serialized.
    let project = state
        .store
        .get_project(&run.project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Project not found: {}", run.project_id)))?;
    ensure_owner(&project, &user)?;

    let logs = state.store.list_logs(&run.id).await?;
    Ok(Json(RunDetailResponse { run, logs }))
}

fn ensure_owner(project: &ProjectRecord, user: &AuthUser) -> Result<()> {
    if project.owner_id.as_deref() == Some(user.id.as_str()) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}
