// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! API error taxonomy and its HTTP mapping.
//!
//! Every failure leaving the server is a JSON body with a single
//! `error` field and a status code from the table below. Core errors
//! fold in through `From`; `InvalidTransition` has no legitimate path
//! to this boundary, so it maps to 500 and is logged as a bug.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use stratus_core::error::CoreError;

/// Request-level errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// Missing or invalid bearer token on an endpoint that requires one.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Authenticated caller is not the resource owner.
    #[error("Forbidden")]
    Forbidden,

    /// The requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request body failed validation.
    #[error("{0}")]
    Validation(String),

    /// Chat proxy has no upstream credentials configured.
    #[error("Chat is not configured")]
    ChatNotConfigured,

    /// The chat upstream rejected or dropped the request.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Storage or other internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::ChatNotConfigured => StatusCode::NOT_IMPLEMENTED,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::RunNotFound(id) => Self::NotFound(format!("Run not found: {id}")),
            CoreError::ProjectNotFound(id) => Self::NotFound(format!("Project not found: {id}")),
            CoreError::Validation { field, message } => {
                Self::Validation(format!("Invalid {field}: {message}"))
            }
            // A transition violation reaching the API surface is a
            // driver bug, not a client error.
            CoreError::InvalidTransition { .. } => Self::Internal(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Result type using ApiError.
pub type Result<T> = std::result::Result<T, ApiError>;
