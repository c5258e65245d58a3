// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQLite-backed store implementation.
//!
//! Used for embedded deployments and as the test backend: the same
//! `Store` contract as PostgreSQL without a live server.

use std::path::Path;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use crate::error::{CoreError, Result};
use crate::status::{LogLevel, RunStatus};

use super::{LogRecord, NewProject, ProjectRecord, RunRecord, Store};

/// SQLite-backed store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new store from an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create and initialize a store backed by an in-memory database.
    ///
    /// The pool is pinned to a single connection with no idle timeout:
    /// an in-memory SQLite database lives and dies with its connection.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        crate::migrations::run_sqlite(&pool)
            .await
            .map_err(|e| CoreError::Database(sqlx::Error::Migrate(Box::new(e))))?;

        Ok(Self { pool })
    }

    /// Create and initialize a store from a database file path.
    ///
    /// Creates parent directories and the database file if missing,
    /// then runs all migrations.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                CoreError::Database(sqlx::Error::Io(std::io::Error::other(format!(
                    "failed to create directory {:?}: {}",
                    parent, e
                ))))
            })?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.to_string_lossy());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        crate::migrations::run_sqlite(&pool)
            .await
            .map_err(|e| CoreError::Database(sqlx::Error::Migrate(Box::new(e))))?;

        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl Store for SqliteStore {
    async fn upsert_project(&self, project: &NewProject) -> Result<ProjectRecord> {
        let record = sqlx::query_as::<_, ProjectRecord>(
            r#"
            INSERT INTO projects (id, name, repo, framework, region, domain, owner_id, visits, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)
            ON CONFLICT (name) DO UPDATE SET
                repo = COALESCE(excluded.repo, projects.repo),
                framework = COALESCE(excluded.framework, projects.framework),
                region = COALESCE(excluded.region, projects.region),
                owner_id = COALESCE(projects.owner_id, excluded.owner_id)
            RETURNING id, name, repo, framework, region, domain, owner_id, visits, created_at
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(&project.name)
        .bind(&project.repo)
        .bind(&project.framework)
        .bind(&project.region)
        .bind(&project.domain)
        .bind(&project.owner_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn get_project(&self, project_id: &str) -> Result<Option<ProjectRecord>> {
        let record = sqlx::query_as::<_, ProjectRecord>(
            r#"
            SELECT id, name, repo, framework, region, domain, owner_id, visits, created_at
            FROM projects
            WHERE id = ?
            "#,
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list_projects_by_owner(&self, owner_id: &str) -> Result<Vec<ProjectRecord>> {
        let records = sqlx::query_as::<_, ProjectRecord>(
            r#"
            SELECT id, name, repo, framework, region, domain, owner_id, visits, created_at
            FROM projects
            WHERE owner_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn increment_project_visits(&self, project_id: &str) -> Result<()> {
        sqlx::query("UPDATE projects SET visits = visits + 1 WHERE id = ?")
            .bind(project_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn insert_run(&self, run_id: &str, project_id: &str) -> Result<RunRecord> {
        let record = sqlx::query_as::<_, RunRecord>(
            r#"
            INSERT INTO runs (id, project_id, status, created_at)
            VALUES (?, ?, 'queued', ?)
            RETURNING id, project_id, status, created_at, started_at, finished_at, build_time
            "#,
        )
        .bind(run_id)
        .bind(project_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn get_run(&self, run_id: &str) -> Result<Option<RunRecord>> {
        let record = sqlx::query_as::<_, RunRecord>(
            r#"
            SELECT id, project_id, status, created_at, started_at, finished_at, build_time
            FROM runs
            WHERE id = ?
            "#,
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list_runs(&self, project_id: &str) -> Result<Vec<RunRecord>> {
        let records = sqlx::query_as::<_, RunRecord>(
            r#"
            SELECT id, project_id, status, created_at, started_at, finished_at, build_time
            FROM runs
            WHERE project_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn transition_run(
        &self,
        run_id: &str,
        from: RunStatus,
        to: RunStatus,
        build_time: Option<&str>,
    ) -> Result<()> {
        if !from.can_transition_to(to) {
            return Err(CoreError::InvalidTransition {
                run_id: run_id.to_string(),
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }

        let result = sqlx::query(
            r#"
            UPDATE runs
            SET status = ?2,
                started_at = CASE WHEN ?7 THEN ?4 ELSE started_at END,
                finished_at = CASE WHEN ?3 THEN ?4 ELSE finished_at END,
                build_time = COALESCE(?5, build_time)
            WHERE id = ?1 AND status = ?6
            "#,
        )
        .bind(run_id)
        .bind(to.as_str())
        .bind(to.is_terminal())
        .bind(Utc::now())
        .bind(build_time)
        .bind(from.as_str())
        .bind(to == RunStatus::Running)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let actual: Option<(String,)> = sqlx::query_as("SELECT status FROM runs WHERE id = ?")
                .bind(run_id)
                .fetch_optional(&self.pool)
                .await?;

            return match actual {
                None => Err(CoreError::RunNotFound(run_id.to_string())),
                Some((status,)) => Err(CoreError::InvalidTransition {
                    run_id: run_id.to_string(),
                    from: status,
                    to: to.as_str().to_string(),
                }),
            };
        }

        Ok(())
    }

    async fn append_log(&self, run_id: &str, level: LogLevel, message: &str) -> Result<LogRecord> {
        let exists: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM runs WHERE id = ?")
            .bind(run_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(CoreError::RunNotFound(run_id.to_string()));
        }

        let record = sqlx::query_as::<_, LogRecord>(
            r#"
            INSERT INTO run_logs (run_id, level, message, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, run_id, level, message, created_at
            "#,
        )
        .bind(run_id)
        .bind(level.as_str())
        .bind(message)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list_logs(&self, run_id: &str) -> Result<Vec<LogRecord>> {
        let records = sqlx::query_as::<_, LogRecord>(
            r#"
            SELECT id, run_id, level, message, created_at
            FROM run_logs
            WHERE run_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn list_stale_running_runs(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<RunRecord>> {
        let records = sqlx::query_as::<_, RunRecord>(
            r#"
            SELECT id, project_id, status, created_at, started_at, finished_at, build_time
            FROM runs
            WHERE status = 'running' AND COALESCE(started_at, created_at) < ?
            ORDER BY created_at ASC
            LIMIT ?
            "#,
        )
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn health_check(&self) -> Result<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
