// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Run registry: allocation and the single-driver-per-run guard.
//!
//! The registry is the only component that starts drivers. It keeps an
//! in-process map of run id to cancellation token for every driver in
//! flight, and refuses to start a second driver for a run that already
//! has one or that is past `queued`. The refusal is a no-op, not an
//! error: double-processing is the failure mode being prevented.

use std::sync::Arc;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::driver::{BuildDriver, DriverConfig};
use crate::error::Result;
use crate::status::RunStatus;
use crate::store::{RunRecord, Store};

/// Maps run identifiers to run records and their active drivers.
pub struct RunRegistry {
    store: Arc<dyn Store>,
    driver: BuildDriver,
    active: Arc<DashMap<String, CancellationToken>>,
}

impl RunRegistry {
    /// Create a registry over the shared store.
    pub fn new(store: Arc<dyn Store>, config: DriverConfig) -> Self {
        let driver = BuildDriver::new(store.clone(), config);
        Self {
            store,
            driver,
            active: Arc::new(DashMap::new()),
        }
    }

    /// Allocate a new run in `queued` status and return its record.
    pub async fn create_run(&self, project_id: &str) -> Result<RunRecord> {
        let run_id = Uuid::new_v4().to_string();
        let run = self.store.insert_run(&run_id, project_id).await?;
        debug!(run_id = %run.id, project_id = %project_id, "run created");
        Ok(run)
    }

    /// Get the current run record, or `None` if unknown.
    pub async fn get(&self, run_id: &str) -> Result<Option<RunRecord>> {
        self.store.get_run(run_id).await
    }

    /// Start the driver for a queued run, fire-and-forget.
    ///
    /// Returns `false` without side effects when a driver is already
    /// active for this run id or the run is not in `queued` status.
    /// The store-level transition guard backs this up: even if two
    /// registries raced here, only one driver would win the
    /// `queued → running` edge.
    pub fn start_driver(&self, run: &RunRecord) -> bool {
        if run.run_status() != RunStatus::Queued {
            debug!(run_id = %run.id, status = %run.status, "not starting driver, run is not queued");
            return false;
        }

        let token = CancellationToken::new();
        match self.active.entry(run.id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                debug!(run_id = %run.id, "not starting driver, one is already active");
                return false;
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(token.clone());
            }
        }

        let driver = self.driver.clone();
        let active = self.active.clone();
        let run_id = run.id.clone();
        let project_id = run.project_id.clone();
        tokio::spawn(async move {
            driver.execute(&run_id, &project_id, token).await;
            active.remove(&run_id);
        });

        info!(run_id = %run.id, "driver started");
        true
    }

    /// Cancel the active driver for a run, if any.
    ///
    /// Cancellation takes effect at the driver's next suspension point,
    /// where it appends a log entry and fails the run. Returns whether
    /// a driver was there to cancel.
    pub fn cancel(&self, run_id: &str) -> bool {
        match self.active.get(run_id) {
            Some(token) => {
                token.cancel();
                info!(run_id = %run_id, "run cancellation requested");
                true
            }
            None => false,
        }
    }

    /// Number of drivers currently in flight.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}
