// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Stratus Core - Simulated Deployment Run Engine
//!
//! This crate provides the run engine behind the stratus API: the run
//! lifecycle state machine, the per-run log stream, the simulated build
//! driver, and the registry that guards driver allocation. All state
//! lives in a shared relational store (PostgreSQL in production, SQLite
//! embedded/testing) so any number of readers can observe a run while
//! its single driver advances it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    stratus-server                        │
//! │              (HTTP API: deploy, status, logs)            │
//! └───────────────┬─────────────────────────────────────────┘
//!                 │ create run + start driver
//!                 ▼
//! ┌───────────────────────┐      detached task
//! │      RunRegistry      │────────────────────┐
//! │ (one driver per run)  │                    ▼
//! └───────────┬───────────┘        ┌───────────────────────┐
//!             │                    │      BuildDriver       │
//!             │                    │ (stages, delays, logs) │
//!             │                    └───────────┬───────────┘
//!             ▼                                ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                     Store (trait)                        │
//! │        PostgresStore / SqliteStore + migrations          │
//! └─────────────────────────────────────────────────────────┘
//!                 ▲
//!                 │ periodic sweep
//!       ┌─────────┴─────────┐
//!       │    RunWatchdog    │
//!       └───────────────────┘
//! ```
//!
//! # Run State Machine
//!
//! ```text
//! queued ──▶ running ──▶ success
//!                 └─────▶ failed
//! ```
//!
//! `success` and `failed` are terminal. Transitions are enforced twice:
//! in [`status::RunStatus::can_transition_to`] and by the store's
//! guarded UPDATE, so a racing writer can never move a run out of a
//! terminal state.
//!
//! # Ordering Guarantees
//!
//! Within one run, log entries read back in append order (timestamp
//! ascending, monotonic id on ties). Across runs there is no ordering:
//! drivers interleave freely.

#![deny(missing_docs)]

/// Simulated build driver (stages, delays, terminal transitions).
pub mod driver;

/// Error types for core operations.
pub mod error;

/// Embedded database migrations for both backends.
pub mod migrations;

/// Run registry and the single-driver-per-run guard.
pub mod registry;

/// Run status state machine and log levels.
pub mod status;

/// Storage contract and PostgreSQL/SQLite backends.
pub mod store;

/// Background watchdog for runs stuck in `running`.
pub mod watchdog;
