// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tests for the deleting reconciler: candidate selection, quota release,
//! partial-failure isolation, idempotent deletion, and physical purge.

mod common;

use std::sync::Arc;
use std::time::Duration;

use armada_core::config::FleetConfig;
use armada_core::status::KafkaStatus;
use armada_fleet::providers::MockQuotaService;
use armada_fleet::services::KafkaService;
use armada_fleet::workers::{DeletingKafkaManager, Worker};

use common::{
    KafkaSeed, cleanup_kafka, get_test_pool, is_soft_deleted, row_exists, seed_kafka,
    serialize_test,
};

/// Helper macro to skip tests if the database URL is not set.
macro_rules! skip_if_no_db {
    () => {
        if std::env::var("TEST_ARMADA_DATABASE_URL").is_err() {
            eprintln!("Skipping test: TEST_ARMADA_DATABASE_URL not set");
            return;
        }
    };
}

const RETENTION: Duration = Duration::from_secs(30 * 24 * 3600);

fn quota_enabled_config() -> FleetConfig {
    FleetConfig {
        enable_quota_accounting: true,
        ..Default::default()
    }
}

fn manager(
    kafkas: KafkaService,
    quotas: Arc<MockQuotaService>,
    fleet_config: FleetConfig,
) -> DeletingKafkaManager {
    DeletingKafkaManager::new(
        "test-deleting-worker".to_string(),
        kafkas,
        quotas,
        Arc::new(fleet_config),
        RETENTION,
    )
}

#[tokio::test]
async fn test_deleting_request_released_and_soft_deleted() {
    skip_if_no_db!();
    let Some(pool) = get_test_pool().await else {
        eprintln!("Skipping test: could not connect to database");
        return;
    };
    let _guard = serialize_test().await;

    let kafkas = KafkaService::new(pool.clone());
    let quotas = Arc::new(MockQuotaService::new());
    let worker = manager(kafkas.clone(), quotas.clone(), quota_enabled_config());

    let kafka = seed_kafka(
        &kafkas,
        KafkaSeed {
            status: KafkaStatus::Deleting,
            subscription_id: Some("sub-release-1".to_string()),
            ..Default::default()
        },
    )
    .await;

    let errors = worker.reconcile().await;
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);

    assert!(quotas.deleted().contains(&"sub-release-1".to_string()));
    assert!(is_soft_deleted(&pool, &kafka.id).await);
    assert!(kafkas.get(&kafka.id).await.unwrap_err().is_not_found());

    cleanup_kafka(&pool, &kafka.id).await;
}

#[tokio::test]
async fn test_legacy_deleted_status_is_a_candidate() {
    skip_if_no_db!();
    let Some(pool) = get_test_pool().await else {
        eprintln!("Skipping test: could not connect to database");
        return;
    };
    let _guard = serialize_test().await;

    let kafkas = KafkaService::new(pool.clone());
    let quotas = Arc::new(MockQuotaService::new());
    let worker = manager(kafkas.clone(), quotas.clone(), quota_enabled_config());

    // A row written by an older deployment: terminal status but no
    // soft-delete marker yet.
    let kafka = seed_kafka(
        &kafkas,
        KafkaSeed {
            status: KafkaStatus::Deleted,
            ..Default::default()
        },
    )
    .await;

    let errors = worker.reconcile().await;
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert!(is_soft_deleted(&pool, &kafka.id).await);

    cleanup_kafka(&pool, &kafka.id).await;
}

#[tokio::test]
async fn test_unprovisioned_deprovision_request_is_a_candidate() {
    skip_if_no_db!();
    let Some(pool) = get_test_pool().await else {
        eprintln!("Skipping test: could not connect to database");
        return;
    };
    let _guard = serialize_test().await;

    let kafkas = KafkaService::new(pool.clone());
    let quotas = Arc::new(MockQuotaService::new());
    let worker = manager(kafkas.clone(), quotas.clone(), quota_enabled_config());

    // Never provisioned: no bootstrap host.
    let unprovisioned = seed_kafka(
        &kafkas,
        KafkaSeed {
            status: KafkaStatus::Deprovision,
            ..Default::default()
        },
    )
    .await;

    // Provisioned: has a bootstrap host, must wait for remote teardown.
    let provisioned = seed_kafka(
        &kafkas,
        KafkaSeed {
            status: KafkaStatus::Deprovision,
            cluster_id: Some("c1".to_string()),
            bootstrap_server_host: Some("orders.kafka.example.com".to_string()),
            ..Default::default()
        },
    )
    .await;

    let errors = worker.reconcile().await;
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);

    assert!(is_soft_deleted(&pool, &unprovisioned.id).await);
    let kept = kafkas.get(&provisioned.id).await.unwrap();
    assert_eq!(kept.status, "deprovision");

    cleanup_kafka(&pool, &unprovisioned.id).await;
    cleanup_kafka(&pool, &provisioned.id).await;
}

#[tokio::test]
async fn test_deprovision_with_auth_missing_sso_credentials_is_a_candidate() {
    skip_if_no_db!();
    let Some(pool) = get_test_pool().await else {
        eprintln!("Skipping test: could not connect to database");
        return;
    };
    let _guard = serialize_test().await;

    let kafkas = KafkaService::new(pool.clone());
    let quotas = Arc::new(MockQuotaService::new());
    let fleet_config = FleetConfig {
        enable_quota_accounting: true,
        enable_instance_authentication: true,
        ..Default::default()
    };
    let worker = manager(kafkas.clone(), quotas.clone(), fleet_config);

    // Bootstrap host set, but auth is enabled and no SSO credentials were
    // ever created: provisioning never completed.
    let kafka = seed_kafka(
        &kafkas,
        KafkaSeed {
            status: KafkaStatus::Deprovision,
            cluster_id: Some("c1".to_string()),
            bootstrap_server_host: Some("orders.kafka.example.com".to_string()),
            ..Default::default()
        },
    )
    .await;

    let errors = worker.reconcile().await;
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert!(is_soft_deleted(&pool, &kafka.id).await);

    cleanup_kafka(&pool, &kafka.id).await;
}

#[tokio::test]
async fn test_quota_failure_isolates_the_record_not_the_batch() {
    skip_if_no_db!();
    let Some(pool) = get_test_pool().await else {
        eprintln!("Skipping test: could not connect to database");
        return;
    };
    let _guard = serialize_test().await;

    let kafkas = KafkaService::new(pool.clone());
    let quotas = Arc::new(MockQuotaService::new());
    quotas.fail_for("sub-broken");
    let worker = manager(kafkas.clone(), quotas.clone(), quota_enabled_config());

    let failing = seed_kafka(
        &kafkas,
        KafkaSeed {
            status: KafkaStatus::Deleting,
            subscription_id: Some("sub-broken".to_string()),
            ..Default::default()
        },
    )
    .await;
    let healthy = seed_kafka(
        &kafkas,
        KafkaSeed {
            status: KafkaStatus::Deleting,
            subscription_id: Some("sub-healthy".to_string()),
            ..Default::default()
        },
    )
    .await;

    let errors = worker.reconcile().await;
    assert_eq!(errors.len(), 1, "exactly the failing record errors");

    // The failing record is retained for the next tick; the healthy one is
    // gone and its quota released.
    assert!(kafkas.get(&failing.id).await.is_ok());
    assert!(is_soft_deleted(&pool, &healthy.id).await);
    assert!(quotas.deleted().contains(&"sub-healthy".to_string()));

    cleanup_kafka(&pool, &failing.id).await;
    cleanup_kafka(&pool, &healthy.id).await;
}

#[tokio::test]
async fn test_quota_release_skipped_when_accounting_disabled() {
    skip_if_no_db!();
    let Some(pool) = get_test_pool().await else {
        eprintln!("Skipping test: could not connect to database");
        return;
    };
    let _guard = serialize_test().await;

    let kafkas = KafkaService::new(pool.clone());
    let quotas = Arc::new(MockQuotaService::new());
    let worker = manager(kafkas.clone(), quotas.clone(), FleetConfig::default());

    let kafka = seed_kafka(
        &kafkas,
        KafkaSeed {
            status: KafkaStatus::Deleting,
            subscription_id: Some("sub-ignored".to_string()),
            ..Default::default()
        },
    )
    .await;

    let errors = worker.reconcile().await;
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert!(is_soft_deleted(&pool, &kafka.id).await);
    assert!(!quotas.deleted().contains(&"sub-ignored".to_string()));

    cleanup_kafka(&pool, &kafka.id).await;
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    skip_if_no_db!();
    let Some(pool) = get_test_pool().await else {
        eprintln!("Skipping test: could not connect to database");
        return;
    };
    let _guard = serialize_test().await;

    let kafkas = KafkaService::new(pool.clone());
    let kafka = seed_kafka(
        &kafkas,
        KafkaSeed {
            status: KafkaStatus::Deleting,
            ..Default::default()
        },
    )
    .await;

    kafkas.delete(&kafka).await.unwrap();
    // Deleting an already-deleted request is a no-op success.
    kafkas.delete(&kafka).await.unwrap();
    assert!(is_soft_deleted(&pool, &kafka.id).await);

    cleanup_kafka(&pool, &kafka.id).await;
}

#[tokio::test]
async fn test_register_deprovision_job_is_idempotent() {
    skip_if_no_db!();
    let Some(pool) = get_test_pool().await else {
        eprintln!("Skipping test: could not connect to database");
        return;
    };
    let _guard = serialize_test().await;

    let kafkas = KafkaService::new(pool.clone());
    let kafka = seed_kafka(
        &kafkas,
        KafkaSeed {
            status: KafkaStatus::Ready,
            ..Default::default()
        },
    )
    .await;

    kafkas.register_deprovision_job(&kafka.id).await.unwrap();
    let reloaded = kafkas.get(&kafka.id).await.unwrap();
    assert_eq!(reloaded.status, "deprovision");

    // Registering again leaves the teardown state untouched.
    kafkas.register_deprovision_job(&kafka.id).await.unwrap();
    let reloaded = kafkas.get(&kafka.id).await.unwrap();
    assert_eq!(reloaded.status, "deprovision");

    cleanup_kafka(&pool, &kafka.id).await;
}

#[tokio::test]
async fn test_purge_removes_rows_past_retention() {
    skip_if_no_db!();
    let Some(pool) = get_test_pool().await else {
        eprintln!("Skipping test: could not connect to database");
        return;
    };
    let _guard = serialize_test().await;

    let kafkas = KafkaService::new(pool.clone());
    let quotas = Arc::new(MockQuotaService::new());
    // Zero retention: anything soft-deleted is immediately purgeable.
    let worker = DeletingKafkaManager::new(
        "test-purge-worker".to_string(),
        kafkas.clone(),
        quotas,
        Arc::new(FleetConfig::default()),
        Duration::ZERO,
    );

    let kafka = seed_kafka(
        &kafkas,
        KafkaSeed {
            status: KafkaStatus::Deleting,
            ..Default::default()
        },
    )
    .await;
    kafkas.delete(&kafka).await.unwrap();

    // Backdate the marker past the (zero) retention window.
    sqlx::query("UPDATE kafka_requests SET deleted_at = NOW() - INTERVAL '1 hour' WHERE id = $1")
        .bind(&kafka.id)
        .execute(&pool)
        .await
        .unwrap();

    let errors = worker.reconcile().await;
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert!(!row_exists(&pool, &kafka.id).await);
}
