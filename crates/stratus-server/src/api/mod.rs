// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP API for the stratus server.
//!
//! Route table:
//! - `GET  /health` — liveness, no auth
//! - `GET  /api/projects` — caller's projects
//! - `GET  /api/runs?project_id=` — runs of an owned project
//! - `GET  /api/runs/{id}` — run detail with full log stream
//! - `POST /api/logs/{run_id}` — trusted log append
//! - `POST /api/deploy` — upsert project, create run, start driver
//! - `POST /api/chat` — chat completion passthrough

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use stratus_core::registry::RunRegistry;
use stratus_core::store::Store;

use crate::auth::{AuthUser, IdentityProvider, resolve_user};
use crate::chat::ChatClient;
use crate::error::{ApiError, Result};

mod chat;
mod deploy;
mod logs;
mod projects;
mod runs;

/// Shared application state.
pub struct AppState {
    /// Shared persistent store.
    pub store: Arc<dyn Store>,
    /// Run allocation and driver lifecycle.
    pub registry: RunRegistry,
    /// Bearer token resolver.
    pub identity: Arc<dyn IdentityProvider>,
    /// Chat completion upstream.
    pub chat: ChatClient,
    /// Suffix for derived project domains.
    pub domain_suffix: String,
}

/// Creates the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/projects", get(projects::list_projects))
        .route("/api/runs", get(runs::list_runs))
        .route("/api/runs/{id}", get(runs::get_run))
        .route("/api/logs/{run_id}", post(logs::append_log))
        .route("/api/deploy", post(deploy::deploy))
        .route("/api/chat", post(chat::chat))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness endpoint.
async fn health() -> impl IntoResponse {
    Json(json!({ "ok": true, "now": Utc::now() }))
}

/// Resolve the caller or fail with 401.
pub(crate) async fn require_user(state: &AppState, headers: &HeaderMap) -> Result<AuthUser> {
    resolve_user(state.identity.as_ref(), headers)
        .await
        .ok_or(ApiError::NotAuthenticated)
}

#[cfg(test)]
mod tests;
