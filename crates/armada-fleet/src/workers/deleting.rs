// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Reconciler for requests on the deletion path.
//!
//! By the time a request reaches `deleting`, the remote shard operator has
//! already torn down its data-plane resources. This phase releases the
//! remaining control-plane dependencies (quota subscription) and
//! soft-deletes the record. Requests still in `deprovision` that were never
//! actually provisioned to a cluster have nothing to tear down remotely and
//! are deleted here directly.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error};

use armada_core::config::FleetConfig;
use armada_core::error::ServiceError;
use armada_core::status::KafkaStatus;

use crate::providers::QuotaService;
use crate::services::{KafkaRequest, KafkaService};
use crate::workers::Worker;
use async_trait::async_trait;

/// Reconciler that finishes request deletion.
pub struct DeletingKafkaManager {
    id: String,
    kafkas: KafkaService,
    quotas: Arc<dyn QuotaService>,
    fleet_config: Arc<FleetConfig>,
    /// How long soft-deleted rows are retained before physical purge.
    retention: Duration,
}

impl DeletingKafkaManager {
    /// Create a new deleting reconciler.
    pub fn new(
        id: String,
        kafkas: KafkaService,
        quotas: Arc<dyn QuotaService>,
        fleet_config: Arc<FleetConfig>,
        retention: Duration,
    ) -> Self {
        Self {
            id,
            kafkas,
            quotas,
            fleet_config,
            retention,
        }
    }

    /// Release external dependencies and soft-delete one request.
    ///
    /// Quota release failure aborts this record (retried next tick) so the
    /// subscription is never leaked by deleting the row first.
    async fn reconcile_deleting(&self, kafka: &KafkaRequest) -> Result<(), ServiceError> {
        if self.fleet_config.enable_quota_accounting
            && let Some(subscription_id) = kafka.subscription_id.as_deref()
            && !subscription_id.is_empty()
        {
            self.quotas.delete_quota(subscription_id).await.map_err(|e| {
                ServiceError::new(
                    e.kind(),
                    format!(
                        "failed to delete subscription '{}' for kafka request '{}': {}",
                        subscription_id, kafka.id, e
                    ),
                )
            })?;
        }

        self.kafkas.delete(kafka).await
    }
}

#[async_trait]
impl Worker for DeletingKafkaManager {
    fn id(&self) -> &str {
        &self.id
    }

    fn worker_type(&self) -> &'static str {
        "deleting_kafka"
    }

    async fn reconcile(&self) -> Vec<ServiceError> {
        let mut errors = Vec::new();

        // The remote operator has already removed these from the data plane.
        let mut deleting = match self.kafkas.list_by_status(&[KafkaStatus::Deleting]).await {
            Ok(kafkas) => kafkas,
            Err(e) => {
                errors.push(ServiceError::new(
                    e.kind(),
                    format!("failed to list deleting kafka requests: {}", e),
                ));
                Vec::new()
            }
        };

        // Deprovisioning requests that never made it onto a cluster have no
        // remote resources and can be deleted immediately.
        match self.kafkas.list_by_status(&[KafkaStatus::Deprovision]).await {
            Ok(deprovisioning) => {
                let auth_enabled = self.fleet_config.enable_instance_authentication;
                for kafka in deprovisioning {
                    if !kafka.was_provisioned(auth_enabled) {
                        deleting.push(kafka);
                    }
                }
            }
            Err(e) => {
                errors.push(ServiceError::new(
                    e.kind(),
                    format!("failed to list deprovisioning kafka requests: {}", e),
                ));
            }
        }

        debug!(count = deleting.len(), "reconciling deleting kafka requests");

        for kafka in deleting {
            if let Err(e) = self.reconcile_deleting(&kafka).await {
                error!(kafka_id = %kafka.id, error = %e, "failed to reconcile deleting kafka request");
                errors.push(e);
            }
        }

        // Soft-deleted rows past the retention window become physically
        // removable.
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.retention).unwrap_or(chrono::Duration::days(30));
        match self.kafkas.purge_soft_deleted(cutoff).await {
            Ok(purged) if purged > 0 => {
                debug!(purged = purged, "purged soft-deleted kafka requests");
            }
            Ok(_) => {}
            Err(e) => {
                errors.push(ServiceError::new(
                    e.kind(),
                    format!("failed to purge soft-deleted kafka requests: {}", e),
                ));
            }
        }

        errors
    }
}
