// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Reconciler for `provisioning` requests: remote readiness.

use std::sync::Arc;

use tracing::{debug, error, warn};

use armada_core::error::ServiceError;
use armada_core::status::KafkaStatus;

use crate::providers::{DataPlaneService, RemoteInstanceState};
use crate::services::{KafkaRequest, KafkaService};
use crate::workers::Worker;
use async_trait::async_trait;

/// Reconciler that promotes provisioning requests once the data plane
/// reports them ready.
pub struct ProvisioningKafkaManager {
    id: String,
    kafkas: KafkaService,
    data_plane: Arc<dyn DataPlaneService>,
}

impl ProvisioningKafkaManager {
    /// Create a new provisioning reconciler.
    pub fn new(id: String, kafkas: KafkaService, data_plane: Arc<dyn DataPlaneService>) -> Self {
        Self {
            id,
            kafkas,
            data_plane,
        }
    }

    async fn reconcile_provisioning(&self, kafka: &KafkaRequest) -> Result<(), ServiceError> {
        let Some(cluster_id) = kafka.cluster_id.as_deref() else {
            return Err(ServiceError::general(format!(
                "provisioning kafka request '{}' has no assigned cluster",
                kafka.id
            )));
        };

        match self.data_plane.instance_status(cluster_id, &kafka.id).await? {
            Some(RemoteInstanceState::Ready) => {
                let mut kafka = kafka.clone();
                // The rollout that just completed installed the desired
                // versions; record them as observed and close any upgrade.
                kafka.actual_kafka_version = kafka.desired_kafka_version.clone();
                kafka.actual_strimzi_version = kafka.desired_strimzi_version.clone();
                kafka.actual_kafka_ibp_version = kafka.desired_kafka_ibp_version.clone();
                kafka.kafka_upgrading = false;
                kafka.strimzi_upgrading = false;
                kafka.kafka_ibp_upgrading = false;
                kafka.status = KafkaStatus::Ready.as_str().to_string();
                self.kafkas.update(&kafka).await?;
                debug!(kafka_id = %kafka.id, "kafka request ready");
                Ok(())
            }
            Some(RemoteInstanceState::Failed) => {
                warn!(kafka_id = %kafka.id, "data plane reports provisioning failure");
                self.kafkas.save_status(&kafka.id, KafkaStatus::Failed).await
            }
            // Still rolling out, or the operator has not picked it up yet.
            Some(RemoteInstanceState::Installing) | None => Ok(()),
            Some(other) => {
                warn!(kafka_id = %kafka.id, state = ?other, "unexpected remote state while provisioning");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Worker for ProvisioningKafkaManager {
    fn id(&self) -> &str {
        &self.id
    }

    fn worker_type(&self) -> &'static str {
        "provisioning_kafka"
    }

    async fn reconcile(&self) -> Vec<ServiceError> {
        let mut errors = Vec::new();

        let provisioning = match self
            .kafkas
            .list_by_status(&[KafkaStatus::Provisioning])
            .await
        {
            Ok(kafkas) => kafkas,
            Err(e) => {
                errors.push(ServiceError::new(
                    e.kind(),
                    format!("failed to list provisioning kafka requests: {}", e),
                ));
                return errors;
            }
        };

        debug!(
            count = provisioning.len(),
            "reconciling provisioning kafka requests"
        );

        for kafka in provisioning {
            if let Err(e) = self.reconcile_provisioning(&kafka).await {
                error!(kafka_id = %kafka.id, error = %e, "failed to reconcile provisioning kafka request");
                errors.push(e);
            }
        }

        errors
    }
}
