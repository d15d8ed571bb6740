// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for armada-fleet integration tests.
//!
//! Tests run against a real PostgreSQL instance addressed by
//! `TEST_ARMADA_DATABASE_URL` and are skipped when it is not set. Records
//! are asserted by id (never by global counts) so suites can share a
//! database.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use armada_core::status::KafkaStatus;
use armada_fleet::services::{KafkaRequest, KafkaService, NewKafkaRequest};

static WORKER_TEST_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

/// Serialize tests whose reconcilers list records globally.
///
/// A reconcile pass sees every candidate row, including ones seeded by a
/// concurrently running test; holding this guard keeps such tests from
/// consuming each other's records.
pub async fn serialize_test() -> tokio::sync::MutexGuard<'static, ()> {
    WORKER_TEST_LOCK.lock().await
}

/// Get a migrated database pool for testing.
pub async fn get_test_pool() -> Option<PgPool> {
    let database_url = std::env::var("TEST_ARMADA_DATABASE_URL").ok()?;
    let pool = PgPool::connect(&database_url).await.ok()?;
    armada_fleet::migrations::run(&pool).await.ok()?;
    Some(pool)
}

/// Overridable fields for seeding a Kafka request.
#[derive(Debug, Clone)]
pub struct KafkaSeed {
    pub status: KafkaStatus,
    pub instance_type: String,
    pub billing_model: String,
    pub cluster_id: Option<String>,
    pub subscription_id: Option<String>,
    pub bootstrap_server_host: Option<String>,
    pub sso_client_id: Option<String>,
    pub sso_client_secret_ref: Option<String>,
    pub desired_kafka_version: Option<String>,
    pub desired_strimzi_version: Option<String>,
    pub desired_kafka_ibp_version: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Default for KafkaSeed {
    fn default() -> Self {
        Self {
            status: KafkaStatus::Accepted,
            instance_type: "standard".to_string(),
            billing_model: "standard".to_string(),
            cluster_id: None,
            subscription_id: None,
            bootstrap_server_host: None,
            sso_client_id: None,
            sso_client_secret_ref: None,
            desired_kafka_version: None,
            desired_strimzi_version: None,
            desired_kafka_ibp_version: None,
            expires_at: None,
        }
    }
}

/// Create a request and drive it into the seeded shape.
pub async fn seed_kafka(kafkas: &KafkaService, seed: KafkaSeed) -> KafkaRequest {
    let mut kafka = kafkas
        .create(&NewKafkaRequest {
            name: "orders".to_string(),
            owner: "alice".to_string(),
            organisation_id: "org-1".to_string(),
            instance_type: seed.instance_type,
            billing_model: seed.billing_model,
            desired_kafka_version: seed.desired_kafka_version,
            desired_strimzi_version: seed.desired_strimzi_version,
            desired_kafka_ibp_version: seed.desired_kafka_ibp_version,
            expires_at: seed.expires_at,
        })
        .await
        .expect("failed to create kafka request");

    kafka.status = seed.status.as_str().to_string();
    kafka.cluster_id = seed.cluster_id;
    kafka.subscription_id = seed.subscription_id;
    kafka.bootstrap_server_host = seed.bootstrap_server_host;
    kafka.sso_client_id = seed.sso_client_id;
    kafka.sso_client_secret_ref = seed.sso_client_secret_ref;
    kafkas
        .update(&kafka)
        .await
        .expect("failed to seed kafka request");

    kafkas
        .get(&kafka.id)
        .await
        .expect("failed to reload seeded kafka request")
}

/// Raw status of a row, ignoring the soft-delete marker.
pub async fn raw_status(pool: &PgPool, id: &str) -> Option<String> {
    sqlx::query_scalar("SELECT status FROM kafka_requests WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .expect("failed to query raw status")
}

/// Whether the row carries a soft-delete marker.
pub async fn is_soft_deleted(pool: &PgPool, id: &str) -> bool {
    let deleted_at: Option<Option<DateTime<Utc>>> =
        sqlx::query_scalar("SELECT deleted_at FROM kafka_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .expect("failed to query deleted_at");
    matches!(deleted_at, Some(Some(_)))
}

/// Whether the row still exists physically.
pub async fn row_exists(pool: &PgPool, id: &str) -> bool {
    raw_status(pool, id).await.is_some()
}

/// Remove a request row regardless of soft-delete state.
pub async fn cleanup_kafka(pool: &PgPool, id: &str) {
    sqlx::query("DELETE FROM kafka_requests WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .ok();
}

/// Remove a connector row regardless of soft-delete state.
pub async fn cleanup_connector(pool: &PgPool, id: &str) {
    sqlx::query("DELETE FROM connectors WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .ok();
}

/// Remove a connector type and its shard metadata.
pub async fn cleanup_connector_type(pool: &PgPool, id: &str) {
    sqlx::query("DELETE FROM connector_shard_metadata WHERE connector_type_id = $1")
        .bind(id)
        .execute(pool)
        .await
        .ok();
    sqlx::query("DELETE FROM connector_types WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .ok();
}
