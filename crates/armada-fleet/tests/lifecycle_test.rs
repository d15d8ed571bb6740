// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! End-to-end lifecycle tests driving requests through the reconcilers
//! against mock collaborators.

mod common;

use std::sync::Arc;

use armada_core::config::FleetConfig;
use armada_core::status::{ConnectorDesiredState, ConnectorStatus, KafkaStatus};
use armada_fleet::providers::{
    MockClusterService, MockDataPlane, MockQuotaService, MockSecretStore, RemoteInstanceState,
    SecretStore,
};
use armada_fleet::services::{
    AdminKafkaService, ConnectorsService, KafkaAdminUpdate, KafkaService, NewConnector,
};
use armada_fleet::workers::{
    AcceptedKafkaManager, ConnectorManager, DeletingKafkaManager, DeprovisioningKafkaManager,
    PreparingKafkaManager, ProvisioningKafkaManager, SuspendResumeKafkaManager, Worker,
};

use common::{
    KafkaSeed, cleanup_connector, cleanup_kafka, get_test_pool, is_soft_deleted, seed_kafka,
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

fn auth_fleet_config() -> FleetConfig {
    FleetConfig {
        enable_quota_accounting: true,
        enable_instance_authentication: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_request_progresses_from_accepted_to_ready() {
    skip_if_no_db!();
    let Some(pool) = get_test_pool().await else {
        eprintln!("Skipping test: could not connect to database");
        return;
    };
    let _guard = serialize_test().await;

    let kafkas = KafkaService::new(pool.clone());
    let clusters = Arc::new(MockClusterService::with_cluster("c1", "kafka.example.com"));
    let secrets = Arc::new(MockSecretStore::new());
    let data_plane = Arc::new(MockDataPlane::new());
    let fleet_config = Arc::new(auth_fleet_config());

    let accepted_mgr = AcceptedKafkaManager::new(
        "accepted-test".to_string(),
        kafkas.clone(),
        clusters.clone(),
    );
    let preparing_mgr = PreparingKafkaManager::new(
        "preparing-test".to_string(),
        kafkas.clone(),
        clusters.clone(),
        secrets.clone(),
        fleet_config.clone(),
    );
    let provisioning_mgr = ProvisioningKafkaManager::new(
        "provisioning-test".to_string(),
        kafkas.clone(),
        data_plane.clone(),
    );

    let kafka = seed_kafka(
        &kafkas,
        KafkaSeed {
            status: KafkaStatus::Accepted,
            desired_kafka_version: Some("3.7.0".to_string()),
            desired_strimzi_version: Some("0.40.0".to_string()),
            desired_kafka_ibp_version: Some("3.7".to_string()),
            ..Default::default()
        },
    )
    .await;

    // accepted → preparing: cluster placement.
    assert!(accepted_mgr.reconcile().await.is_empty());
    let placed = kafkas.get(&kafka.id).await.unwrap();
    assert_eq!(placed.status, "preparing");
    assert_eq!(placed.cluster_id.as_deref(), Some("c1"));
    assert!(placed.placement_id.is_some());

    // preparing → provisioning: endpoints and SSO credentials.
    assert!(preparing_mgr.reconcile().await.is_empty());
    let prepared = kafkas.get(&kafka.id).await.unwrap();
    assert_eq!(prepared.status, "provisioning");
    let bootstrap = prepared.bootstrap_server_host.clone().unwrap();
    assert!(bootstrap.ends_with("kafka.example.com"));
    let secret_ref = prepared.sso_client_secret_ref.clone().unwrap();
    assert!(secrets.contains(&secret_ref));

    // Not reported by the operator yet: stays provisioning.
    assert!(provisioning_mgr.reconcile().await.is_empty());
    assert_eq!(kafkas.get(&kafka.id).await.unwrap().status, "provisioning");

    // Still rolling out: stays provisioning.
    data_plane.set_state(&kafka.id, RemoteInstanceState::Installing);
    assert!(provisioning_mgr.reconcile().await.is_empty());
    assert_eq!(kafkas.get(&kafka.id).await.unwrap().status, "provisioning");

    // Remote confirmation: ready, desired versions observed.
    data_plane.set_state(&kafka.id, RemoteInstanceState::Ready);
    assert!(provisioning_mgr.reconcile().await.is_empty());
    let ready = kafkas.get(&kafka.id).await.unwrap();
    assert_eq!(ready.status, "ready");
    assert_eq!(ready.actual_kafka_version.as_deref(), Some("3.7.0"));
    assert_eq!(ready.actual_strimzi_version.as_deref(), Some("0.40.0"));
    assert!(!ready.kafka_upgrading);

    cleanup_kafka(&pool, &kafka.id).await;
}

#[tokio::test]
async fn test_suspend_resume_roundtrip_with_remote_confirmation() {
    skip_if_no_db!();
    let Some(pool) = get_test_pool().await else {
        eprintln!("Skipping test: could not connect to database");
        return;
    };
    let _guard = serialize_test().await;

    let kafkas = KafkaService::new(pool.clone());
    let clusters = Arc::new(MockClusterService::with_cluster("c1", "kafka.example.com"));
    let data_plane = Arc::new(MockDataPlane::new());
    let admin = AdminKafkaService::new(
        kafkas.clone(),
        clusters.clone(),
        Arc::new(FleetConfig::default()),
    );
    let suspend_resume_mgr = SuspendResumeKafkaManager::new(
        "suspend-resume-test".to_string(),
        kafkas.clone(),
        data_plane.clone(),
    );

    let kafka = seed_kafka(
        &kafkas,
        KafkaSeed {
            status: KafkaStatus::Ready,
            cluster_id: Some("c1".to_string()),
            bootstrap_server_host: Some("orders.kafka.example.com".to_string()),
            ..Default::default()
        },
    )
    .await;
    data_plane.set_state(&kafka.id, RemoteInstanceState::Ready);

    // PATCH {"suspended": true} → suspending.
    let updated = admin
        .update(
            &kafka.id,
            &KafkaAdminUpdate {
                suspended: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, "suspending");

    // Remote still reports ready: no transition yet.
    assert!(suspend_resume_mgr.reconcile().await.is_empty());
    assert_eq!(kafkas.get(&kafka.id).await.unwrap().status, "suspending");

    // Remote confirms the stop.
    data_plane.set_state(&kafka.id, RemoteInstanceState::Suspended);
    assert!(suspend_resume_mgr.reconcile().await.is_empty());
    assert_eq!(kafkas.get(&kafka.id).await.unwrap().status, "suspended");

    // PATCH {"suspended": false} → resuming, then remote confirms.
    let updated = admin
        .update(
            &kafka.id,
            &KafkaAdminUpdate {
                suspended: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, "resuming");

    data_plane.set_state(&kafka.id, RemoteInstanceState::Ready);
    assert!(suspend_resume_mgr.reconcile().await.is_empty());
    assert_eq!(kafkas.get(&kafka.id).await.unwrap().status, "ready");

    cleanup_kafka(&pool, &kafka.id).await;
}

#[tokio::test]
async fn test_deprovision_flow_ends_in_removal_and_quota_release() {
    skip_if_no_db!();
    let Some(pool) = get_test_pool().await else {
        eprintln!("Skipping test: could not connect to database");
        return;
    };
    let _guard = serialize_test().await;

    let kafkas = KafkaService::new(pool.clone());
    let quotas = Arc::new(MockQuotaService::new());
    let data_plane = Arc::new(MockDataPlane::new());
    let fleet_config = Arc::new(FleetConfig {
        enable_quota_accounting: true,
        ..Default::default()
    });

    let deprovisioning_mgr = DeprovisioningKafkaManager::new(
        "deprovisioning-test".to_string(),
        kafkas.clone(),
        data_plane.clone(),
        fleet_config.clone(),
    );
    let deleting_mgr = DeletingKafkaManager::new(
        "deleting-test".to_string(),
        kafkas.clone(),
        quotas.clone(),
        fleet_config.clone(),
        std::time::Duration::from_secs(30 * 24 * 3600),
    );

    let kafka = seed_kafka(
        &kafkas,
        KafkaSeed {
            status: KafkaStatus::Ready,
            cluster_id: Some("c1".to_string()),
            bootstrap_server_host: Some("orders.kafka.example.com".to_string()),
            subscription_id: Some("sub-lifecycle".to_string()),
            ..Default::default()
        },
    )
    .await;
    data_plane.set_state(&kafka.id, RemoteInstanceState::Ready);

    // DELETE → deprovision.
    kafkas.register_deprovision_job(&kafka.id).await.unwrap();
    assert_eq!(kafkas.get(&kafka.id).await.unwrap().status, "deprovision");

    // Remote teardown not finished: record waits.
    assert!(deprovisioning_mgr.reconcile().await.is_empty());
    assert_eq!(kafkas.get(&kafka.id).await.unwrap().status, "deprovision");

    // Operator removed the instance: deprovision → deleting.
    data_plane.set_state(&kafka.id, RemoteInstanceState::Removed);
    assert!(deprovisioning_mgr.reconcile().await.is_empty());
    assert_eq!(kafkas.get(&kafka.id).await.unwrap().status, "deleting");

    // Deleting reconciler releases quota and soft-deletes the record.
    assert!(deleting_mgr.reconcile().await.is_empty());
    assert!(quotas.deleted().contains(&"sub-lifecycle".to_string()));
    assert!(is_soft_deleted(&pool, &kafka.id).await);

    cleanup_kafka(&pool, &kafka.id).await;
}

#[tokio::test]
async fn test_connector_deletion_cleans_secret_after_commit() {
    skip_if_no_db!();
    let Some(pool) = get_test_pool().await else {
        eprintln!("Skipping test: could not connect to database");
        return;
    };
    let _guard = serialize_test().await;

    let connectors = ConnectorsService::new(pool.clone());
    let secrets = Arc::new(MockSecretStore::new());
    let manager = ConnectorManager::new(
        "connector-test".to_string(),
        connectors.clone(),
        secrets.clone(),
    );

    let secret_ref = format!("connector/{}/config", uuid::Uuid::new_v4());
    secrets
        .store_secret_string(&secret_ref, "db-password")
        .await
        .unwrap();

    let connector = connectors
        .create(&NewConnector {
            name: "http-sink".to_string(),
            owner: "alice".to_string(),
            organisation_id: "org-1".to_string(),
            connector_type_id: "http-sink".to_string(),
            channel: "stable".to_string(),
            desired_state: ConnectorDesiredState::Ready,
            kafka_id: None,
            secret_ref: Some(secret_ref.clone()),
        })
        .await
        .unwrap();

    connectors.register_deletion(&connector.id).await.unwrap();

    let errors = manager.reconcile().await;
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);

    assert!(connectors.get(&connector.id).await.unwrap_err().is_not_found());
    assert!(!secrets.contains(&secret_ref));
    assert!(secrets.deleted().contains(&secret_ref));

    cleanup_connector(&pool, &connector.id).await;
}

#[tokio::test]
async fn test_connector_phase_converges_to_desired_state() {
    skip_if_no_db!();
    let Some(pool) = get_test_pool().await else {
        eprintln!("Skipping test: could not connect to database");
        return;
    };
    let _guard = serialize_test().await;

    let connectors = ConnectorsService::new(pool.clone());
    let secrets = Arc::new(MockSecretStore::new());
    let manager = ConnectorManager::new(
        "connector-phase-test".to_string(),
        connectors.clone(),
        secrets,
    );

    let connector = connectors
        .create(&NewConnector {
            name: "jdbc-source".to_string(),
            owner: "alice".to_string(),
            organisation_id: "org-1".to_string(),
            connector_type_id: "jdbc-source".to_string(),
            channel: "stable".to_string(),
            desired_state: ConnectorDesiredState::Ready,
            kafka_id: None,
            secret_ref: None,
        })
        .await
        .unwrap();

    // Still waiting for placement: convergence leaves assigning alone.
    assert!(manager.reconcile().await.is_empty());
    assert_eq!(connectors.get(&connector.id).await.unwrap().status, "assigning");

    // Once the data plane owns it, a stopped connector with desired ready
    // converges back.
    connectors
        .save_status(&connector.id, ConnectorStatus::Stopped)
        .await
        .unwrap();
    assert!(manager.reconcile().await.is_empty());
    assert_eq!(connectors.get(&connector.id).await.unwrap().status, "ready");

    cleanup_connector(&pool, &connector.id).await;
}
