// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Reconciler for `deprovision` requests: remote teardown.
//!
//! The remote shard operator watches desired state and removes deprovision
//! instances from the data plane on its own; this reconciler advances a
//! record to `deleting` once the operator no longer reports it. Requests
//! that were never provisioned are not handled here - the deleting
//! reconciler picks them up directly.

use std::sync::Arc;

use tracing::{debug, error};

use armada_core::config::FleetConfig;
use armada_core::error::ServiceError;
use armada_core::status::KafkaStatus;

use crate::providers::{DataPlaneService, RemoteInstanceState};
use crate::services::{KafkaRequest, KafkaService};
use crate::workers::Worker;
use async_trait::async_trait;

/// Reconciler confirming data-plane teardown of deprovisioned requests.
pub struct DeprovisioningKafkaManager {
    id: String,
    kafkas: KafkaService,
    data_plane: Arc<dyn DataPlaneService>,
    fleet_config: Arc<FleetConfig>,
}

impl DeprovisioningKafkaManager {
    /// Create a new deprovisioning reconciler.
    pub fn new(
        id: String,
        kafkas: KafkaService,
        data_plane: Arc<dyn DataPlaneService>,
        fleet_config: Arc<FleetConfig>,
    ) -> Self {
        Self {
            id,
            kafkas,
            data_plane,
            fleet_config,
        }
    }

    async fn reconcile_deprovisioning(&self, kafka: &KafkaRequest) -> Result<(), ServiceError> {
        let Some(cluster_id) = kafka.cluster_id.as_deref() else {
            // Provisioned but unplaced should not happen; leave the record
            // for the deleting reconciler's unprovisioned check.
            return Ok(());
        };

        match self.data_plane.instance_status(cluster_id, &kafka.id).await? {
            None | Some(RemoteInstanceState::Removed) => {
                self.kafkas
                    .save_status(&kafka.id, KafkaStatus::Deleting)
                    .await?;
                debug!(kafka_id = %kafka.id, "data plane teardown confirmed");
                Ok(())
            }
            // Operator is still tearing down; retry next tick.
            Some(_) => Ok(()),
        }
    }
}

#[async_trait]
impl Worker for DeprovisioningKafkaManager {
    fn id(&self) -> &str {
        &self.id
    }

    fn worker_type(&self) -> &'static str {
        "deprovisioning_kafka"
    }

    async fn reconcile(&self) -> Vec<ServiceError> {
        let mut errors = Vec::new();

        let deprovisioning = match self.kafkas.list_by_status(&[KafkaStatus::Deprovision]).await {
            Ok(kafkas) => kafkas,
            Err(e) => {
                errors.push(ServiceError::new(
                    e.kind(),
                    format!("failed to list deprovisioning kafka requests: {}", e),
                ));
                return errors;
            }
        };

        debug!(
            count = deprovisioning.len(),
            "reconciling deprovisioning kafka requests"
        );

        let auth_enabled = self.fleet_config.enable_instance_authentication;
        for kafka in deprovisioning {
            if !kafka.was_provisioned(auth_enabled) {
                continue;
            }
            if let Err(e) = self.reconcile_deprovisioning(&kafka).await {
                error!(kafka_id = %kafka.id, error = %e, "failed to reconcile deprovisioning kafka request");
                errors.push(e);
            }
        }

        errors
    }
}
