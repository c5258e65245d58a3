// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Stratus Server - Simulated Deployment Backend
//!
//! An HTTP server responsible for:
//! - Project registration and listing
//! - Deploys (run allocation + detached build driver)
//! - Run status and log stream reads
//! - Chat completion passthrough

use std::sync::Arc;

use tracing::{info, warn};

use stratus_core::driver::DriverConfig;
use stratus_core::registry::RunRegistry;
use stratus_core::store::{PostgresStore, SqliteStore, Store};
use stratus_core::watchdog::{RunWatchdog, WatchdogConfig};

use stratus_server::api::{AppState, router};
use stratus_server::auth::{HttpIdentityProvider, IdentityProvider, StaticIdentityProvider};
use stratus_server::chat::ChatClient;
use stratus_server::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stratus_server=info,stratus_core=info".into()),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    // Load configuration
    let config = Config::from_env()?;

    info!(
        http_addr = %config.http_addr,
        "Starting Stratus Server"
    );

    // Connect to the database and run migrations
    let store: Arc<dyn Store> = if config.database_url.starts_with("postgres") {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await?;
        stratus_core::migrations::run_postgres(&pool).await?;
        Arc::new(PostgresStore::new(pool))
    } else {
        Arc::new(SqliteStore::from_path(&config.database_url).await?)
    };

    info!("Connected to database");

    // Identity provider: delegated over HTTP, or anonymous-only when
    // no provider is configured.
    let identity: Arc<dyn IdentityProvider> = match &config.auth_url {
        Some(url) => {
            info!(auth_url = %url, "Identity provider configured");
            Arc::new(HttpIdentityProvider::new(url.clone()))
        }
        None => {
            warn!("No identity provider configured; all requests are anonymous");
            Arc::new(StaticIdentityProvider::new())
        }
    };

    let chat = ChatClient::new(
        config.chat_api_url.clone(),
        config.chat_api_key.clone(),
        config.chat_model.clone(),
    );
    if config.chat_api_key.is_none() {
        warn!("No chat API key configured; /api/chat will return 501");
    }

    let registry = RunRegistry::new(store.clone(), DriverConfig::default());

    // Watchdog for runs stuck in `running`
    let watchdog = RunWatchdog::new(
        store.clone(),
        WatchdogConfig {
            run_timeout: config.run_timeout,
            ..WatchdogConfig::default()
        },
    );
    let watchdog_shutdown = watchdog.shutdown_handle();
    let watchdog_handle = tokio::spawn(async move { watchdog.run().await });

    let state = Arc::new(AppState {
        store,
        registry,
        identity,
        chat,
        domain_suffix: config.domain_suffix.clone(),
    });

    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    info!(addr = %config.http_addr, "Stratus Server ready");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    // Graceful shutdown
    watchdog_shutdown.notify_one();
    watchdog_handle.await?;

    info!("Stratus Server shut down");

    Ok(())
}
