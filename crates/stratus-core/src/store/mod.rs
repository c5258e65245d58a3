// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Storage interfaces and backends for stratus-core.
//!
//! All components (API handlers, driver, registry, watchdog) share one
//! [`Store`]. There is no in-process lock around it; correctness relies
//! on per-row atomicity and the guarded status transition in
//! [`Store::transition_run`]. Readers may observe a run's status
//! slightly before or after its log tail — accepted relaxed
//! consistency, not a bug.

/// PostgreSQL backend.
pub mod postgres;
/// SQLite backend for embedded and test use.
pub mod sqlite;

pub use self::postgres::PostgresStore;
pub use self::sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::status::{LogLevel, RunStatus};

/// Project record from the storage layer.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProjectRecord {
    /// Unique project identifier.
    pub id: String,
    /// Unique human-chosen project name.
    pub name: String,
    /// Repository reference.
    pub repo: Option<String>,
    /// Framework tag (e.g. "nextjs").
    pub framework: Option<String>,
    /// Deployment region tag.
    pub region: Option<String>,
    /// Derived domain string.
    pub domain: String,
    /// Owning user id; set at most once, never cleared.
    pub owner_id: Option<String>,
    /// Best-effort visitor counter.
    pub visits: i64,
    /// When the project was first created.
    pub created_at: DateTime<Utc>,
}

/// Run record from the storage layer.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RunRecord {
    /// Unique run identifier.
    pub id: String,
    /// Owning project identifier.
    pub project_id: String,
    /// Current status (queued, running, success, failed).
    pub status: String,
    /// When the run was created.
    pub created_at: DateTime<Utc>,
    /// When the driver took the run (the `queued → running` edge).
    pub started_at: Option<DateTime<Utc>>,
    /// When the run reached a terminal status.
    pub finished_at: Option<DateTime<Utc>>,
    /// Human-readable build duration, set on success only.
    pub build_time: Option<String>,
}

impl RunRecord {
    /// Parse the stored status string.
    ///
    /// Falls back to `Failed` for unknown values, which can only appear
    /// if the database was edited out-of-band.
    pub fn run_status(&self) -> RunStatus {
        self.status.parse().unwrap_or(RunStatus::Failed)
    }
}

/// Log entry record from the storage layer.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LogRecord {
    /// Monotonic identifier; the authoritative tie-breaker for entries
    /// sharing a timestamp.
    pub id: i64,
    /// Owning run identifier.
    pub run_id: String,
    /// Severity level (info, error).
    pub level: String,
    /// Message text.
    pub message: String,
    /// Server-assigned timestamp.
    pub created_at: DateTime<Utc>,
}

/// Fields for creating or updating a project via deploy.
#[derive(Debug, Clone)]
pub struct NewProject {
    /// Unique project name; the upsert key.
    pub name: String,
    /// Repository reference.
    pub repo: Option<String>,
    /// Framework tag.
    pub framework: Option<String>,
    /// Deployment region tag.
    pub region: Option<String>,
    /// Derived domain string.
    pub domain: String,
    /// Owner id to set if the project has none yet.
    pub owner_id: Option<String>,
}

/// Storage contract shared by all components.
///
/// PostgreSQL is the production backend; SQLite is the embedded/test
/// backend. Both enforce the same semantics, in particular the guarded
/// status transition.
#[async_trait]
pub trait Store: Send + Sync {
    /// Create a project, or update the mutable fields of the existing
    /// project with the same name.
    ///
    /// Uniqueness of `name` is a database constraint, so two concurrent
    /// first deploys for the same name converge on a single row. The
    /// owner is backfilled only when absent; an existing owner is never
    /// reassigned.
    async fn upsert_project(&self, project: &NewProject) -> Result<ProjectRecord>;

    /// Get a project by id. Returns `None` if unknown.
    async fn get_project(&self, project_id: &str) -> Result<Option<ProjectRecord>>;

    /// List projects owned by `owner_id`, newest first.
    async fn list_projects_by_owner(&self, owner_id: &str) -> Result<Vec<ProjectRecord>>;

    /// Best-effort visitor counter bump. Callers treat failures as
    /// non-fatal; see [`BuildDriver`](crate::driver::BuildDriver).
    async fn increment_project_visits(&self, project_id: &str) -> Result<()>;

    /// Insert a new run in `queued` status.
    async fn insert_run(&self, run_id: &str, project_id: &str) -> Result<RunRecord>;

    /// Get a run by id. Returns `None` if unknown.
    async fn get_run(&self, run_id: &str) -> Result<Option<RunRecord>>;

    /// List runs for a project, newest first.
    async fn list_runs(&self, project_id: &str) -> Result<Vec<RunRecord>>;

    /// Atomically move a run from `from` to `to`.
    ///
    /// The update is guarded with `WHERE status = from`; when the guard
    /// misses, the error is [`InvalidTransition`] carrying the status
    /// actually observed (or [`RunNotFound`] for an unknown id) and the
    /// row is untouched. Entering `running` records `started_at`;
    /// terminal transitions record `finished_at`; `build_time` is
    /// stored only when provided (success path).
    ///
    /// [`InvalidTransition`]: crate::error::CoreError::InvalidTransition
    /// [`RunNotFound`]: crate::error::CoreError::RunNotFound
    async fn transition_run(
        &self,
        run_id: &str,
        from: RunStatus,
        to: RunStatus,
        build_time: Option<&str>,
    ) -> Result<()>;

    /// Append one log entry with a server-assigned timestamp.
    ///
    /// Fails with [`RunNotFound`](crate::error::CoreError::RunNotFound)
    /// when the run does not exist. Entries are never updated or
    /// deleted.
    async fn append_log(&self, run_id: &str, level: LogLevel, message: &str) -> Result<LogRecord>;

    /// Full ordered log sequence for a run: timestamp ascending, insert
    /// order on ties. Empty vec (not an error) when the run has no
    /// entries yet.
    async fn list_logs(&self, run_id: &str) -> Result<Vec<LogRecord>>;

    /// Runs still `running` whose driver started before `cutoff`,
    /// oldest first. Used by the watchdog, so the timeout bound
    /// measures time spent in `running`, not time since creation.
    async fn list_stale_running_runs(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<RunRecord>>;

    /// Database connectivity check.
    async fn health_check(&self) -> Result<bool>;
}
