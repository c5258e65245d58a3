// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Deploy endpoint: project upsert, run allocation, driver start.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use stratus_core::store::NewProject;

use super::{AppState, require_user};
use crate::error::{ApiError, Result};

#[derive(Deserialize)]
pub(crate) struct DeployRequest {
    #[serde(default)]
    payload: Option<DeployPayload>,
}

#[derive(Deserialize)]
pub(crate) struct DeployPayload {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    repo: Option<String>,
    #[serde(default)]
    framework: Option<String>,
    #[serde(default)]
    region: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeployResponse {
    run_id: String,
    project_id: String,
    status: &'static str,
}

/// Create or update a project, allocate a queued run, and start its
/// driver without awaiting it.
pub(crate) async fn deploy(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<DeployRequest>,
) -> Result<Json<DeployResponse>> {
    let user = require_user(&state, &headers).await?;

    let payload = request
        .payload
        .ok_or_else(|| ApiError::Validation("Missing payload".into()))?;
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::Validation("Missing payload.name".into()))?;

    let slug = slugify(name);
    if slug.is_empty() {
        return Err(ApiError::Validation(
            "payload.name must contain at least one alphanumeric character".into(),
        ));
    }
    let project = state
        .store
        .upsert_project(&NewProject {
            name: name.to_string(),
            repo: payload.repo,
            framework: payload.framework,
            region: payload.region,
            domain: format!("{slug}.{}", state.domain_suffix),
            owner_id: Some(user.id.clone()),
        })
        .await?;

    let run = state.registry.create_run(&project.id).await?;
    state.registry.start_driver(&run);

    info!(
        run_id = %run.id,
        project_id = %project.id,
        user_id = %user.id,
        "deploy accepted"
    );

    Ok(Json(DeployResponse {
        run_id: run.id,
        project_id: project.id,
        status: "queued",
    }))
}

/// Lowercase the name and collapse anything non-alphanumeric into
/// single dashes, trimming dashes at both ends.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
