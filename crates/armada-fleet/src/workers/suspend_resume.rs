// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Reconciler for the suspend/resume branches.
//!
//! The admin service moves records into `suspending`/`resuming`; this
//! reconciler completes the branch once the remote shard operator confirms
//! the new state.

use std::sync::Arc;

use tracing::{debug, error};

use armada_core::error::ServiceError;
use armada_core::status::KafkaStatus;

use crate::providers::{DataPlaneService, RemoteInstanceState};
use crate::services::{KafkaRequest, KafkaService};
use crate::workers::Worker;
use async_trait::async_trait;

/// Reconciler confirming suspend and resume transitions.
pub struct SuspendResumeKafkaManager {
    id: String,
    kafkas: KafkaService,
    data_plane: Arc<dyn DataPlaneService>,
}

impl SuspendResumeKafkaManager {
    /// Create a new suspend/resume reconciler.
    pub fn new(id: String, kafkas: KafkaService, data_plane: Arc<dyn DataPlaneService>) -> Self {
        Self {
            id,
            kafkas,
            data_plane,
        }
    }

    async fn remote_state(
        &self,
        kafka: &KafkaRequest,
    ) -> Result<Option<RemoteInstanceState>, ServiceError> {
        let Some(cluster_id) = kafka.cluster_id.as_deref() else {
            return Err(ServiceError::general(format!(
                "kafka request '{}' in status '{}' has no assigned cluster",
                kafka.id, kafka.status
            )));
        };
        self.data_plane.instance_status(cluster_id, &kafka.id).await
    }

    async fn reconcile_suspending(&self, kafka: &KafkaRequest) -> Result<(), ServiceError> {
        if self.remote_state(kafka).await? == Some(RemoteInstanceState::Suspended) {
            self.kafkas
                .save_status(&kafka.id, KafkaStatus::Suspended)
                .await?;
            debug!(kafka_id = %kafka.id, "kafka request suspended");
        }
        Ok(())
    }

    async fn reconcile_resuming(&self, kafka: &KafkaRequest) -> Result<(), ServiceError> {
        if self.remote_state(kafka).await? == Some(RemoteInstanceState::Ready) {
            self.kafkas.save_status(&kafka.id, KafkaStatus::Ready).await?;
            debug!(kafka_id = %kafka.id, "kafka request resumed");
        }
        Ok(())
    }
}

#[async_trait]
impl Worker for SuspendResumeKafkaManager {
    fn id(&self) -> &str {
        &self.id
    }

    fn worker_type(&self) -> &'static str {
        "suspend_resume_kafka"
    }

    async fn reconcile(&self) -> Vec<ServiceError> {
        let mut errors = Vec::new();

        match self.kafkas.list_by_status(&[KafkaStatus::Suspending]).await {
            Ok(suspending) => {
                debug!(count = suspending.len(), "reconciling suspending kafka requests");
                for kafka in suspending {
                    if let Err(e) = self.reconcile_suspending(&kafka).await {
                        error!(kafka_id = %kafka.id, error = %e, "failed to reconcile suspending kafka request");
                        errors.push(e);
                    }
                }
            }
            Err(e) => errors.push(ServiceError::new(
                e.kind(),
                format!("failed to list suspending kafka requests: {}", e),
            )),
        }

        match self.kafkas.list_by_status(&[KafkaStatus::Resuming]).await {
            Ok(resuming) => {
                debug!(count = resuming.len(), "reconciling resuming kafka requests");
                for kafka in resuming {
                    if let Err(e) = self.reconcile_resuming(&kafka).await {
                        error!(kafka_id = %kafka.id, error = %e, "failed to reconcile resuming kafka request");
                        errors.push(e);
                    }
                }
            }
            Err(e) => errors.push(ServiceError::new(
                e.kind(),
                format!("failed to list resuming kafka requests: {}", e),
            )),
        }

        errors
    }
}
