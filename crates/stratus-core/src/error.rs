// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for stratus-core.

use thiserror::Error;

/// Core errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoreError {
    /// Run was not found.
    #[error("Run not found: {0}")]
    RunNotFound(String),

    /// Project was not found.
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    /// A status transition violated the run state machine.
    ///
    /// This is always a bug in the caller (a driver advancing a run it
    /// no longer owns, or a second writer racing a terminal state). It
    /// must never be surfaced through the API as a client error.
    #[error("Run '{run_id}' cannot transition from '{from}' to '{to}'")]
    InvalidTransition {
        /// The run that was being advanced.
        run_id: String,
        /// The status the run was observed in.
        from: String,
        /// The status the caller tried to move it to.
        to: String,
    },

    /// Input validation failed.
    #[error("Validation error for '{field}': {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// The validation error message.
        message: String,
    },

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type using CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;
