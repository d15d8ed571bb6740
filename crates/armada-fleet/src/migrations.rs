// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Database migrations for the fleet schema.
//!
//! The migrations are embedded at compile time and cover the request store
//! (`kafka_requests`, `connectors`) and the connector catalog
//! (`connector_types`, `connector_type_channels`, `connector_shard_metadata`).
//!
//! # Example
//!
//! ```ignore
//! use sqlx::PgPool;
//! use armada_fleet::migrations;
//!
//! let pool = PgPool::connect(&database_url).await?;
//! migrations::run(&pool).await?;
//! ```

use sqlx::migrate::{MigrateError, Migrator};

/// Fleet migrations embedded at compile time.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run all fleet migrations.
///
/// Safe to call multiple times; already-applied migrations are skipped.
pub async fn run(pool: &sqlx::PgPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}
