// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Bearer token resolution against an external identity provider.
//!
//! The server never validates tokens itself. The raw bearer token is
//! forwarded to the identity provider's get-user endpoint; a valid
//! token resolves to an [`AuthUser`], anything else resolves to an
//! anonymous context. Anonymous is not an error: only endpoints that
//! require authentication turn it into a 401.

use async_trait::async_trait;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::debug;

/// Authenticated caller identity.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    /// Stable user identifier from the identity provider.
    pub id: String,
    /// Email, when the provider exposes one.
    #[serde(default)]
    pub email: Option<String>,
}

/// Resolves bearer tokens to users.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a raw bearer token. `None` for invalid or expired
    /// tokens; an `Err` only for transport failures, which callers
    /// also treat as anonymous.
    async fn user_from_token(&self, token: &str) -> Result<Option<AuthUser>, reqwest::Error>;
}

/// Identity provider reached over HTTP.
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIdentityProvider {
    /// Create a provider rooted at `base_url` (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn user_from_token(&self, token: &str) -> Result<Option<AuthUser>, reqwest::Error> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "token rejected by identity provider");
            return Ok(None);
        }

        let user = response.json::<AuthUser>().await?;
        Ok(Some(user))
    }
}

/// Identity provider with a fixed token table, for tests and local use.
#[derive(Default)]
pub struct StaticIdentityProvider {
    users: Vec<(String, AuthUser)>,
}

impl StaticIdentityProvider {
    /// Empty provider: every token is anonymous.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token that resolves to `user_id`.
    pub fn with_user(mut self, token: impl Into<String>, user_id: impl Into<String>) -> Self {
        self.users.push((
            token.into(),
            AuthUser {
                id: user_id.into(),
                email: None,
            },
        ));
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn user_from_token(&self, token: &str) -> Result<Option<AuthUser>, reqwest::Error> {
        Ok(self
            .users
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, user)| user.clone()))
    }
}

/// Extract the bearer token from request headers, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}

/// Resolve the request's caller, treating every failure as anonymous.
pub async fn resolve_user(
    provider: &dyn IdentityProvider,
    headers: &HeaderMap,
) -> Option<AuthUser> {
    let token = bearer_token(headers)?;
    match provider.user_from_token(token).await {
        Ok(user) => user,
        Err(e) => {
            debug!(error = %e, "identity provider unreachable, treating caller as anonymous");
            None
        }
    }
}
