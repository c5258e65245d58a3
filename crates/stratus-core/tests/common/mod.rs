// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for stratus-core integration tests.
//!
//! Provides a TestContext over an in-memory SQLite store plus a fault
//! injection wrapper for exercising driver failure paths.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stratus_core::error::{CoreError, Result};
use stratus_core::status::{LogLevel, RunStatus};
use stratus_core::store::{
    LogRecord, NewProject, ProjectRecord, RunRecord, SqliteStore, Store,
};

/// Test context that manages an in-memory store with migrations applied.
pub struct TestContext {
    pub store: Arc<SqliteStore>,
}

impl TestContext {
    /// Create a fresh in-memory database with the full schema.
    pub async fn new() -> Self {
        let store = SqliteStore::in_memory()
            .await
            .expect("Failed to create in-memory store");
        Self {
            store: Arc::new(store),
        }
    }

    /// Create a project with sensible defaults and return its record.
    pub async fn create_project(&self, name: &str) -> ProjectRecord {
        self.store
            .upsert_project(&NewProject {
                name: name.to_string(),
                repo: Some(format!("github.com/acme/{name}")),
                framework: Some("nextjs".to_string()),
                region: Some("eu-central".to_string()),
                domain: format!("{name}.stratus.app"),
                owner_id: None,
            })
            .await
            .expect("Failed to create test project")
    }

    /// Create a queued run for a project.
    pub async fn create_run(&self, project_id: &str) -> RunRecord {
        let run_id = uuid::Uuid::new_v4().to_string();
        self.store
            .insert_run(&run_id, project_id)
            .await
            .expect("Failed to create test run")
    }

    /// Move a run from queued into running.
    pub async fn mark_running(&self, run_id: &str) {
        self.store
            .transition_run(run_id, RunStatus::Queued, RunStatus::Running, None)
            .await
            .expect("Failed to mark run running");
    }

    /// Poll until a run reaches a terminal status, or panic after
    /// `timeout` of waiting.
    pub async fn wait_for_terminal(&self, run_id: &str, timeout: Duration) -> RunRecord {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let run = self
                .store
                .get_run(run_id)
                .await
                .expect("Failed to fetch run")
                .expect("Run disappeared while waiting");
            if run.run_status().is_terminal() {
                return run;
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("run {run_id} did not reach a terminal status (last: {})", run.status);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// All log messages for a run, in stream order.
    pub async fn log_messages(&self, run_id: &str) -> Vec<String> {
        self.store
            .list_logs(run_id)
            .await
            .expect("Failed to list logs")
            .into_iter()
            .map(|entry| entry.message)
            .collect()
    }
}

/// Store wrapper that fails `append_log` after a configured number of
/// successful appends. Everything else delegates to the inner store.
pub struct FlakyStore {
    inner: Arc<dyn Store>,
    appends_before_failure: usize,
    appends_seen: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn Store>, appends_before_failure: usize) -> Self {
        Self {
            inner,
            appends_before_failure,
            appends_seen: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn upsert_project(&self, project: &NewProject) -> Result<ProjectRecord> {
        self.inner.upsert_project(project).await
    }

    async fn get_project(&self, project_id: &str) -> Result<Option<ProjectRecord>> {
        self.inner.get_project(project_id).await
    }

    async fn list_projects_by_owner(&self, owner_id: &str) -> Result<Vec<ProjectRecord>> {
        self.inner.list_projects_by_owner(owner_id).await
    }

    async fn increment_project_visits(&self, project_id: &str) -> Result<()> {
        self.inner.increment_project_visits(project_id).await
    }

    async fn insert_run(&self, run_id: &str, project_id: &str) -> Result<RunRecord> {
        self.inner.insert_run(run_id, project_id).await
    }

    async fn get_run(&self, run_id: &str) -> Result<Option<RunRecord>> {
        self.inner.get_run(run_id).await
    }

    async fn list_runs(&self, project_id: &str) -> Result<Vec<RunRecord>> {
        self.inner.list_runs(project_id).await
    }

    async fn transition_run(
        &self,
        run_id: &str,
        from: RunStatus,
        to: RunStatus,
        build_time: Option<&str>,
    ) -> Result<()> {
        self.inner.transition_run(run_id, from, to, build_time).await
    }

    async fn append_log(&self, run_id: &str, level: LogLevel, message: &str) -> Result<LogRecord> {
        let seen = self.appends_seen.fetch_add(1, Ordering::SeqCst);
        if seen >= self.appends_before_failure {
            return Err(CoreError::Database(sqlx::Error::PoolClosed));
        }
        self.inner.append_log(run_id, level, message).await
    }

    async fn list_logs(&self, run_id: &str) -> Result<Vec<LogRecord>> {
        self.inner.list_logs(run_id).await
    }

    async fn list_stale_running_runs(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<RunRecord>> {
        self.inner.list_stale_running_runs(cutoff, limit).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.inner.health_check().await
    }
}
