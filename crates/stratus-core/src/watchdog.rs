// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Background worker for detecting and failing stuck runs.
//!
//! A driver that dies between store writes (or a store call that never
//! returns) can leave a run in `running` forever. The watchdog sweeps
//! for runs that have been `running` longer than the configured bound
//! and force-fails them with a log entry. The guarded transition makes
//! the sweep safe to race against a driver that finishes at the same
//! moment: the loser of the race becomes a no-op.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::error::{CoreError, Result};
use crate::status::{LogLevel, RunStatus};
use crate::store::Store;

/// Configuration for the run watchdog.
#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    /// How often to sweep for stuck runs.
    pub poll_interval: Duration,
    /// Maximum time a run may stay in `running` before it is failed.
    pub run_timeout: Duration,
    /// Maximum runs failed per sweep.
    pub batch_limit: i64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            run_timeout: Duration::from_secs(600),
            batch_limit: 100,
        }
    }
}

/// Background worker that force-fails runs stuck in `running`.
pub struct RunWatchdog {
    store: Arc<dyn Store>,
    config: WatchdogConfig,
    shutdown: Arc<Notify>,
}

impl RunWatchdog {
    /// Create a new watchdog over the shared store.
    pub fn new(store: Arc<dyn Store>, config: WatchdogConfig) -> Self {
        Self {
            store,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get a handle that can be used to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Run the watchdog loop until shutdown is signalled.
    pub async fn run(&self) {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            run_timeout_secs = self.config.run_timeout.as_secs(),
            "run watchdog started"
        );

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.notified() => {
                    info!("run watchdog received shutdown signal");
                    break;
                }

                _ = tokio::time::sleep(self.config.poll_interval) => {
                    if let Err(e) = self.sweep().await {
                        error!(error = %e, "watchdog sweep failed");
                    }
                }
            }
        }
    }

    /// One sweep: find stale running runs and force-fail each.
    ///
    /// Per-run failures do not abort the sweep; the next tick retries
    /// whatever is still stuck.
    pub async fn sweep(&self) -> Result<usize> {
        let timeout = chrono::Duration::from_std(self.config.run_timeout)
            .unwrap_or_else(|_| chrono::Duration::seconds(600));
        let cutoff = Utc::now() - timeout;

        let stale = self
            .store
            .list_stale_running_runs(cutoff, self.config.batch_limit)
            .await?;

        let mut failed = 0;
        for run in stale {
            match self
                .store
                .transition_run(&run.id, RunStatus::Running, RunStatus::Failed, None)
                .await
            {
                Ok(()) => {
                    warn!(run_id = %run.id, "force-failed stuck run");
                    if let Err(e) = self
                        .store
                        .append_log(&run.id, LogLevel::Error, "Build timed out")
                        .await
                    {
                        error!(run_id = %run.id, error = %e, "failed to append timeout log");
                    }
                    failed += 1;
                }
                // The driver finished between the sweep query and the
                // guarded update. Nothing to do.
                Err(CoreError::InvalidTransition { .. }) => {
                    debug!(run_id = %run.id, "stuck run resolved itself before force-fail");
                }
                Err(e) => {
                    error!(run_id = %run.id, error = %e, "failed to force-fail stuck run");
                }
            }
        }

        Ok(failed)
    }
}
