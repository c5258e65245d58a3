// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for stratus-server.

use std::net::SocketAddr;
use std::time::Duration;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database URL; `postgres://` selects the PostgreSQL backend,
    /// anything else is treated as a SQLite path.
    pub database_url: String,
    /// HTTP listen address.
    pub http_addr: SocketAddr,
    /// Base URL of the identity provider; `None` disables bearer
    /// resolution (every request is anonymous).
    pub auth_url: Option<String>,
    /// Chat completion upstream URL.
    pub chat_api_url: String,
    /// Chat completion API key; `None` means the proxy is unconfigured.
    pub chat_api_key: Option<String>,
    /// Default model sent upstream when the client names none.
    pub chat_model: String,
    /// Domain suffix for derived project domains.
    pub domain_suffix: String,
    /// Maximum time a run may stay `running` before the watchdog fails it.
    pub run_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("STRATUS_DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("STRATUS_DATABASE_URL"))?;

        let port: u16 = std::env::var("STRATUS_HTTP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let http_addr = SocketAddr::from(([0, 0, 0, 0], port));

        let auth_url = std::env::var("STRATUS_AUTH_URL").ok();

        let chat_api_url = std::env::var("STRATUS_CHAT_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string());
        let chat_api_key = std::env::var("STRATUS_CHAT_API_KEY").ok();
        let chat_model =
            std::env::var("STRATUS_CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let domain_suffix =
            std::env::var("STRATUS_DOMAIN_SUFFIX").unwrap_or_else(|_| "stratus.dev".to_string());

        let run_timeout_secs: u64 = std::env::var("STRATUS_RUN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "600".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidDuration("STRATUS_RUN_TIMEOUT_SECS"))?;

        Ok(Self {
            database_url,
            http_addr,
            auth_url,
            chat_api_url,
            chat_api_key,
            chat_model,
            domain_suffix,
            run_timeout: Duration::from_secs(run_timeout_secs),
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    /// The port number is invalid.
    #[error("Invalid port number")]
    InvalidPort,
    /// A duration variable could not be parsed as whole seconds.
    #[error("Invalid duration in seconds: {0}")]
    InvalidDuration(&'static str),
}
