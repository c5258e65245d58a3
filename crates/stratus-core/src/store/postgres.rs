// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL-backed store implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::{CoreError, Result};
use crate::status::{LogLevel, RunStatus};

use super::{LogRecord, NewProject, ProjectRecord, RunRecord, Store};

/// PostgreSQL-backed store. Production backend.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new store from an existing pool.
    ///
    /// The caller is responsible for running migrations, typically via
    /// [`crate::migrations::run_postgres`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Store for PostgresStore {
    async fn upsert_project(&self, project: &NewProject) -> Result<ProjectRecord> {
        let record = sqlx::query_as::<_, ProjectRecord>(
            r#"
            INSERT INTO projects (id, name, repo, framework, region, domain, owner_id, visits, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0, NOW())
            ON CONFLICT (name) DO UPDATE SET
                repo = COALESCE(EXCLUDED.repo, projects.repo),
                framework = COALESCE(EXCLUDED.framework, projects.framework),
                region = COALESCE(EXCLUDED.region, projects.region),
                owner_id = COALESCE(projects.owner_id, EXCLUDED.owner_id)
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
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn get_project(&self, project_id: &str) -> Result<Option<ProjectRecord>> {
        let record = sqlx::query_as::<_, ProjectRecord>(
            r#"
            SELECT id, name, repo, framework, region, domain, owner_id, visits, created_at
            FROM projects
            WHERE id = $1
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
            WHERE owner_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn increment_project_visits(&self, project_id: &str) -> Result<()> {
        sqlx::query("UPDATE projects SET visits = visits + 1 WHERE id = $1")
            .bind(project_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn insert_run(&self, run_id: &str, project_id: &str) -> Result<RunRecord> {
        let record = sqlx::query_as::<_, RunRecord>(
            r#"
            INSERT INTO runs (id, project_id, status, created_at)
            VALUES ($1, $2, 'queued', $3)
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
            WHERE id = $1
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
            WHERE project_id = $1
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
            SET status = $2,
                started_at = CASE WHEN $6 THEN NOW() ELSE started_at END,
                finished_at = CASE WHEN $3 THEN NOW() ELSE finished_at END,
                build_time = COALESCE($4, build_time)
            WHERE id = $1 AND status = $5
            "#,
        )
        .bind(run_id)
        .bind(to.as_str())
        .bind(to.is_terminal())
        .bind(build_time)
        .bind(from.as_str())
        .bind(to == RunStatus::Running)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Guard missed: report what the row actually holds.
            let actual: Option<(String,)> =
                sqlx::query_as("SELECT status FROM runs WHERE id = $1")
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
        let exists: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM runs WHERE id = $1")
            .bind(run_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(CoreError::RunNotFound(run_id.to_string()));
        }

        let record = sqlx::query_as::<_, LogRecord>(
            r#"
            INSERT INTO run_logs (run_id, level, message, created_at)
            VALUES ($1, $2, $3, $4)
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
            WHERE run_id = $1
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
            WHERE status = 'running' AND COALESCE(started_at, created_at) < $1
            ORDER BY created_at ASC
            LIMIT $2
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
