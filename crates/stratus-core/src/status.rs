// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Run lifecycle status and log levels.
//!
//! The run state machine is:
//!
//! ```text
//!     ┌────────┐
//!     │ QUEUED │
//!     └───┬────┘
//!         │ driver start
//!         ▼
//!     ┌─────────┐
//!     │ RUNNING │──────────┐
//!     └───┬─────┘          │
//!         │ all stages     │ any failure
//!         ▼                ▼
//!     ┌─────────┐      ┌────────┐
//!     │ SUCCESS │      │ FAILED │
//!     └─────────┘      └────────┘
//! ```
//!
//! `success` and `failed` are terminal: no transition leaves them. The
//! enum encodes the legal edges; the store enforces them again with a
//! guarded UPDATE so concurrent writers cannot bypass the check.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Run created, driver not yet started.
    Queued,
    /// Driver is advancing the run through its stages.
    Running,
    /// All stages completed; terminal.
    Success,
    /// A stage or store write failed, or the run was cancelled; terminal.
    Failed,
}

impl RunStatus {
    /// The status as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// Whether no further transitions are permitted from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    ///
    /// Transitions are monotonic: queued → running → {success | failed}.
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Running)
                | (Self::Running, Self::Success)
                | (Self::Running, Self::Failed)
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown run status: {other}")),
        }
    }
}

/// Severity of a log entry. Open to extension; only these two are
/// emitted today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Informational progress message.
    Info,
    /// Failure description.
    Error,
}

impl LogLevel {
    /// The level as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}
