// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Connection-pool configuration.
//!
//! The engine receives a fully configured pool from its caller; this module
//! is the one place that knows how the caps map onto the driver. No internal
//! timeout defaults are imposed — deadlines come from the caller.

use std::time::Duration;

use serde::Deserialize;
use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::error::Result;

/// Pool caps and connection target.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// PostgreSQL connection URL.
    pub url: String,

    /// Maximum open connections.
    #[serde(default = "default_max_open")]
    pub max_open: u32,

    /// Connections kept idle and warm.
    #[serde(default)]
    pub max_idle: u32,

    /// Maximum connection lifetime in seconds; `None` keeps connections
    /// until they fail.
    #[serde(default)]
    pub max_lifetime_secs: Option<u64>,

    /// Pool acquisition timeout in seconds; `None` imposes no engine-side
    /// deadline beyond the driver default.
    #[serde(default)]
    pub acquire_timeout_secs: Option<u64>
}

const fn default_max_open() -> u32 {
    10
}

impl StoreConfig {
    /// Config for a URL with default caps.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_open: default_max_open(),
            max_idle: 0,
            max_lifetime_secs: None,
            acquire_timeout_secs: None
        }
    }
}

/// Open a pool with the configured caps.
///
/// # Errors
///
/// [`crate::RepoError::Internal`] when the pool cannot be established.
pub async fn connect(config: &StoreConfig) -> Result<PgPool> {
    let mut options = PgPoolOptions::new()
        .max_connections(config.max_open)
        .min_connections(config.max_idle);
    if let Some(secs) = config.max_lifetime_secs {
        options = options.max_lifetime(Duration::from_secs(secs));
    }
    if let Some(secs) = config.acquire_timeout_secs {
        options = options.acquire_timeout(Duration::from_secs(secs));
    }

    let pool = options.connect(&config.url).await?;
    tracing::info!(
        max_open = config.max_open,
        max_idle = config.max_idle,
        "connection pool established"
    );
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_on_sparse_input() {
        let config: StoreConfig =
            serde_json::from_str(r#"{"url": "postgres://localhost/aas"}"#).unwrap();
        assert_eq!(config.max_open, 10);
        assert_eq!(config.max_idle, 0);
        assert_eq!(config.max_lifetime_secs, None);
        assert_eq!(config.acquire_timeout_secs, None);
    }

    #[test]
    fn caps_deserialize_camel_case() {
        let config: StoreConfig = serde_json::from_str(
            r#"{"url": "postgres://localhost/aas", "maxOpen": 32, "maxIdle": 4,
                "maxLifetimeSecs": 600, "acquireTimeoutSecs": 5}"#
        )
        .unwrap();
        assert_eq!(config.max_open, 32);
        assert_eq!(config.max_idle, 4);
        assert_eq!(config.max_lifetime_secs, Some(600));
        assert_eq!(config.acquire_timeout_secs, Some(5));
    }
}
