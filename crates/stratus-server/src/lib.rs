// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Stratus Server - HTTP API for the simulated deployment backend
//!
//! Exposes the run engine from `stratus-core` over HTTP/JSON:
//! project listing, deploys, run status/log reads, a trusted log
//! append endpoint, and a chat completion passthrough. Caller identity
//! is resolved by delegating bearer tokens to an external identity
//! provider; the server itself holds no credentials for users.

#![deny(missing_docs)]

/// Route table, handlers, and shared application state.
pub mod api;

/// Bearer token resolution against the identity provider.
pub mod auth;

/// Chat completion upstream client.
pub mod chat;

/// Environment-based configuration.
pub mod config;

/// API error taxonomy and HTTP mapping.
pub mod error;
