// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Reconciler for `preparing` requests: endpoints and credentials.
//!
//! Builds the instance's client-facing endpoints from the assigned
//! cluster's base domain and, when instance authentication is enabled,
//! creates the SSO client secret in the vault before recording its
//! reference. The secret is written before the database row so a crash
//! between the two leaves an unreferenced secret (cleaned up on retry by
//! overwriting the same reference) rather than a row pointing at nothing.

use std::sync::Arc;

use tracing::{debug, error};
use uuid::Uuid;

use armada_core::config::FleetConfig;
use armada_core::error::ServiceError;
use armada_core::status::KafkaStatus;

use crate::providers::{ClusterService, SecretStore};
use crate::services::{KafkaRequest, KafkaService};
use crate::workers::Worker;
use async_trait::async_trait;

/// Reconciler that prepares placed requests for provisioning.
pub struct PreparingKafkaManager {
    id: String,
    kafkas: KafkaService,
    clusters: Arc<dyn ClusterService>,
    secrets: Arc<dyn SecretStore>,
    fleet_config: Arc<FleetConfig>,
}

impl PreparingKafkaManager {
    /// Create a new preparing reconciler.
    pub fn new(
        id: String,
        kafkas: KafkaService,
        clusters: Arc<dyn ClusterService>,
        secrets: Arc<dyn SecretStore>,
        fleet_config: Arc<FleetConfig>,
    ) -> Self {
        Self {
            id,
            kafkas,
            clusters,
            secrets,
            fleet_config,
        }
    }

    async fn reconcile_preparing(&self, kafka: &KafkaRequest) -> Result<(), ServiceError> {
        let cluster_id = kafka.cluster_id.as_deref().ok_or_else(|| {
            ServiceError::general(format!(
                "preparing kafka request '{}' has no assigned cluster",
                kafka.id
            ))
        })?;
        let cluster = self
            .clusters
            .find_cluster_by_id(cluster_id)
            .await?
            .ok_or_else(|| {
                ServiceError::general(format!(
                    "cluster '{}' assigned to kafka request '{}' not found",
                    cluster_id, kafka.id
                ))
            })?;

        let mut kafka = kafka.clone();
        let bootstrap = format!("{}-{}.{}", kafka.name, kafka.id, cluster.cluster_dns);
        kafka.admin_api_server_url = Some(format!("https://admin-server-{}", bootstrap));
        kafka.bootstrap_server_host = Some(bootstrap);

        if self.fleet_config.enable_instance_authentication {
            let secret_ref = format!("kafka/{}/sso-secret", kafka.id);
            let secret_value = Uuid::new_v4().to_string();
            self.secrets
                .store_secret_string(&secret_ref, &secret_value)
                .await
                .map_err(|e| {
                    ServiceError::new(
                        e.kind(),
                        format!(
                            "failed to store sso secret for kafka request '{}': {}",
                            kafka.id, e
                        ),
                    )
                })?;
            kafka.sso_client_id = Some(format!("kafka-{}", kafka.id));
            kafka.sso_client_secret_ref = Some(secret_ref);
        }

        kafka.status = KafkaStatus::Provisioning.as_str().to_string();
        self.kafkas.update(&kafka).await?;

        debug!(kafka_id = %kafka.id, "kafka request prepared");
        Ok(())
    }
}

#[async_trait]
impl Worker for PreparingKafkaManager {
    fn id(&self) -> &str {
        &self.id
    }

    fn worker_type(&self) -> &'static str {
        "preparing_kafka"
    }

    async fn reconcile(&self) -> Vec<ServiceError> {
        let mut errors = Vec::new();

        let preparing = match self.kafkas.list_by_status(&[KafkaStatus::Preparing]).await {
            Ok(kafkas) => kafkas,
            Err(e) => {
                errors.push(ServiceError::new(
                    e.kind(),
                    format!("failed to list preparing kafka requests: {}", e),
                ));
                return errors;
            }
        };

        debug!(count = preparing.len(), "reconciling preparing kafka requests");

        for kafka in preparing {
            if let Err(e) = self.reconcile_preparing(&kafka).await {
                error!(kafka_id = %kafka.id, error = %e, "failed to reconcile preparing kafka request");
                errors.push(e);
            }
        }

        errors
    }
}
