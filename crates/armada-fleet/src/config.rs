// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for armada-fleet.

use std::time::Duration;

/// Fleet service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database URL for the fleet store.
    pub database_url: String,
    /// How often each lifecycle reconciler polls the store.
    pub reconcile_interval: Duration,
    /// How often the connector catalog reconciler runs.
    pub catalog_interval: Duration,
    /// How long soft-deleted rows are retained before physical purge.
    pub deleted_retention: Duration,
    /// Advisory lock key used for leader election.
    pub leader_lock_key: i64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("ARMADA_DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("ARMADA_DATABASE_URL"))?;

        let reconcile_interval_secs: u64 = std::env::var("ARMADA_RECONCILE_INTERVAL_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidInterval("ARMADA_RECONCILE_INTERVAL_SECS"))?;

        let catalog_interval_secs: u64 = std::env::var("ARMADA_CATALOG_INTERVAL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidInterval("ARMADA_CATALOG_INTERVAL_SECS"))?;

        let retention_days: u64 = std::env::var("ARMADA_DELETED_RETENTION_DAYS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidInterval("ARMADA_DELETED_RETENTION_DAYS"))?;

        let leader_lock_key: i64 = std::env::var("ARMADA_LEADER_LOCK_KEY")
            .unwrap_or_else(|_| "7446".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidLockKey)?;

        Ok(Self {
            database_url,
            reconcile_interval: Duration::from_secs(reconcile_interval_secs),
            catalog_interval: Duration::from_secs(catalog_interval_secs),
            deleted_retention: Duration::from_secs(retention_days * 24 * 3600),
            leader_lock_key,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    /// An interval variable is not a valid number.
    #[error("Invalid value for {0}")]
    InvalidInterval(&'static str),
    /// The leader lock key is not a valid integer.
    #[error("Invalid leader lock key")]
    InvalidLockKey,
}
