// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Reconciler for `accepted` requests: cluster placement.

use std::sync::Arc;

use tracing::{debug, error};
use uuid::Uuid;

use armada_core::error::ServiceError;
use armada_core::status::KafkaStatus;

use crate::providers::ClusterService;
use crate::services::{KafkaRequest, KafkaService};
use crate::workers::Worker;
use async_trait::async_trait;

/// Reconciler that places accepted requests on a data-plane cluster.
pub struct AcceptedKafkaManager {
    id: String,
    kafkas: KafkaService,
    clusters: Arc<dyn ClusterService>,
}

impl AcceptedKafkaManager {
    /// Create a new accepted reconciler.
    pub fn new(id: String, kafkas: KafkaService, clusters: Arc<dyn ClusterService>) -> Self {
        Self {
            id,
            kafkas,
            clusters,
        }
    }

    async fn reconcile_accepted(&self, kafka: &KafkaRequest) -> Result<(), ServiceError> {
        let Some(cluster) = self
            .clusters
            .find_available_cluster(&kafka.instance_type)
            .await?
        else {
            // No capacity right now; the record stays accepted and the next
            // tick retries.
            debug!(kafka_id = %kafka.id, instance_type = %kafka.instance_type, "no cluster capacity available");
            return Ok(());
        };

        if let Some(strimzi) = kafka.desired_strimzi_version.as_deref() {
            let available = self
                .clusters
                .is_version_available_in_cluster(
                    &cluster,
                    strimzi,
                    kafka.desired_kafka_version.as_deref().unwrap_or_default(),
                    kafka
                        .desired_kafka_ibp_version
                        .as_deref()
                        .unwrap_or_default(),
                )
                .await?;
            if !available {
                return Err(ServiceError::validation(format!(
                    "desired versions of kafka request '{}' are not available in cluster '{}'",
                    kafka.id, cluster.cluster_id
                )));
            }
        }

        let mut kafka = kafka.clone();
        kafka.cluster_id = Some(cluster.cluster_id.clone());
        kafka.placement_id = Some(Uuid::new_v4().to_string());
        kafka.status = KafkaStatus::Preparing.as_str().to_string();
        self.kafkas.update(&kafka).await?;

        debug!(kafka_id = %kafka.id, cluster_id = %cluster.cluster_id, "kafka request placed");
        Ok(())
    }
}

#[async_trait]
impl Worker for AcceptedKafkaManager {
    fn id(&self) -> &str {
        &self.id
    }

    fn worker_type(&self) -> &'static str {
        "accepted_kafka"
    }

    async fn reconcile(&self) -> Vec<ServiceError> {
        let mut errors = Vec::new();

        let accepted = match self.kafkas.list_by_status(&[KafkaStatus::Accepted]).await {
            Ok(kafkas) => kafkas,
            Err(e) => {
                errors.push(ServiceError::new(
                    e.kind(),
                    format!("failed to list accepted kafka requests: {}", e),
                ));
                return errors;
            }
        };

        debug!(count = accepted.len(), "reconciling accepted kafka requests");

        for kafka in accepted {
            if let Err(e) = self.reconcile_accepted(&kafka).await {
                error!(kafka_id = %kafka.id, error = %e, "failed to reconcile accepted kafka request");
                errors.push(e);
            }
        }

        errors
    }
}
