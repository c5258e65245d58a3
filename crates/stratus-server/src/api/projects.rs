// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Project listing.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::Serialize;

use stratus_core::store::ProjectRecord;

use super::{AppState, require_user};
use crate::error::Result;

#[derive(Serialize)]
pub(crate) struct ProjectListResponse {
    projects: Vec<ProjectRecord>,
}

/// List the caller's projects, newest first.
pub(crate) async fn list_projects(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ProjectListResponse>> {
    let user = require_user(&state, &headers).await?;
    let projects = state.store.list_projects_by_owner(&user.id).await?;
    Ok(Json(ProjectListResponse { projects }))
}
