// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Simulated build driver.
//!
//! A driver advances exactly one run through the scripted stage list,
//! transitioning the run state machine and appending log entries as it
//! goes. It runs as a detached task: the caller that created the run
//! never awaits it and never receives its outcome synchronously — the
//! outcome is observable only through subsequent reads of run and log
//! state.
//!
//! Failure semantics: no retries. Every failure path terminates the run
//! in `failed` with an error-leveled log entry. The driver never
//! propagates an error to a caller; a store failure while reporting a
//! failure is the one unrecoverable case and is only logged.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::status::{LogLevel, RunStatus};
use crate::store::Store;

/// Ordered stage list for the simulated pipeline.
pub const STAGES: [&str; 7] = [
    "clone",
    "install dependencies",
    "build assets",
    "run tests",
    "package",
    "upload",
    "activate services",
];

/// Timing configuration for the simulated stages.
///
/// Each stage suspends for `base_delay` plus a uniform random jitter in
/// `0..=max_jitter`. The distribution is not load-bearing; it only has
/// to produce variable, non-zero, bounded delays.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Fixed component of the per-stage delay.
    pub base_delay: Duration,
    /// Upper bound of the random per-stage jitter.
    pub max_jitter: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(400),
            max_jitter: Duration::from_millis(600),
        }
    }
}

/// Drives one run through the simulated pipeline.
#[derive(Clone)]
pub struct BuildDriver {
    store: Arc<dyn Store>,
    config: DriverConfig,
}

impl BuildDriver {
    /// Create a new driver over the shared store.
    pub fn new(store: Arc<dyn Store>, config: DriverConfig) -> Self {
        Self { store, config }
    }

    /// Begin the simulated build for `run_id` as a detached task.
    ///
    /// Returns immediately. All failures are caught inside the task and
    /// encoded as a terminal `failed` status plus a log entry; nothing
    /// can crash the host process from here.
    pub fn start(&self, run_id: String, project_id: String, cancel: CancellationToken) {
        let driver = self.clone();
        tokio::spawn(async move {
            driver.execute(&run_id, &project_id, cancel).await;
        });
    }

    /// Run the pipeline to a terminal state.
    ///
    /// Exposed for callers (the registry) that need to know when the
    /// driver has finished, e.g. to drop its active-map entry. Never
    /// returns an error.
    pub async fn execute(&self, run_id: &str, project_id: &str, cancel: CancellationToken) {
        // A second driver for the same run loses this guarded
        // transition and backs off without touching anything.
        if let Err(e) = self
            .store
            .transition_run(run_id, RunStatus::Queued, RunStatus::Running, None)
            .await
        {
            warn!(run_id = %run_id, error = %e, "driver start rejected, leaving run untouched");
            return;
        }

        info!(run_id = %run_id, project_id = %project_id, "build started");

        match self.run_stages(run_id, &cancel).await {
            Ok(StageOutcome::Completed { build_time }) => {
                if let Err(e) = self
                    .store
                    .transition_run(run_id, RunStatus::Running, RunStatus::Success, Some(&build_time))
                    .await
                {
                    error!(run_id = %run_id, error = %e, "failed to record build success");
                    return;
                }
                if let Err(e) = self
                    .store
                    .append_log(
                        run_id,
                        LogLevel::Info,
                        &format!("Build completed in {build_time}"),
                    )
                    .await
                {
                    error!(run_id = %run_id, error = %e, "failed to append success log");
                }
                info!(run_id = %run_id, build_time = %build_time, "build succeeded");

                // Best-effort notification; a failure here must not
                // affect the terminal state.
                if let Err(e) = self.store.increment_project_visits(project_id).await {
                    warn!(project_id = %project_id, error = %e, "visit counter increment failed");
                }
            }
            Ok(StageOutcome::Cancelled) => {
                self.fail_run(run_id, "Build cancelled").await;
            }
            Err(e) => {
                self.fail_run(run_id, &format!("Build failed: {e}")).await;
            }
        }
    }

    /// Advance through the stage list, suspending between stages.
    async fn run_stages(&self, run_id: &str, cancel: &CancellationToken) -> Result<StageOutcome> {
        let started = Instant::now();

        self.store
            .append_log(run_id, LogLevel::Info, "Build queued")
            .await?;

        for stage in STAGES {
            self.store
                .append_log(run_id, LogLevel::Info, &format!("Stage '{stage}' in progress"))
                .await?;

            let delay = self.stage_delay();
            debug!(run_id = %run_id, stage = %stage, delay_ms = delay.as_millis() as u64, "stage running");

            tokio::select! {
                _ = cancel.cancelled() => return Ok(StageOutcome::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let elapsed = started.elapsed();
        Ok(StageOutcome::Completed {
            build_time: format!("{:.1}s", elapsed.as_secs_f64()),
        })
    }

    /// Per-stage delay: base plus bounded random jitter.
    fn stage_delay(&self) -> Duration {
        let jitter_ms = {
            let mut rng = rand::thread_rng();
            rng.gen_range(0..=self.config.max_jitter.as_millis() as u64)
        };
        self.config.base_delay + Duration::from_millis(jitter_ms)
    }

    /// Terminate the run in `failed` with an error log entry.
    ///
    /// Both writes are best-effort at this point; if the store is down
    /// there is nothing left to report to, so the failures are logged
    /// and swallowed.
    async fn fail_run(&self, run_id: &str, reason: &str) {
        warn!(run_id = %run_id, reason = %reason, "build failed");

        if let Err(e) = self
            .store
            .transition_run(run_id, RunStatus::Running, RunStatus::Failed, None)
            .await
        {
            error!(run_id = %run_id, error = %e, "failed to record build failure");
        }
        if let Err(e) = self.store.append_log(run_id, LogLevel::Error, reason).await {
            error!(run_id = %run_id, error = %e, "failed to append failure log");
        }
    }
}

enum StageOutcome {
    Completed { build_time: String },
    Cancelled,
}
