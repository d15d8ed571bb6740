// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Reconciler for connector workloads.
//!
//! Converges each connector's observed phase toward its desired state.
//! Deletion is the interesting case: the database row is soft-deleted
//! first, and the connector's vault secret is deleted only after that
//! commit succeeds - a rolled-back delete must never orphan a record whose
//! secret is already gone. Secret deletion failure after commit is logged
//! and surfaced; retrying it is safe because vault deletes are idempotent.

use std::sync::Arc;

use tracing::{debug, error, warn};

use armada_core::error::ServiceError;
use armada_core::status::{ConnectorDesiredState, ConnectorStatus};

use crate::providers::SecretStore;
use crate::services::{Connector, ConnectorsService};
use crate::workers::Worker;
use async_trait::async_trait;

/// Reconciler converging connectors toward their desired state.
pub struct ConnectorManager {
    id: String,
    connectors: ConnectorsService,
    secrets: Arc<dyn SecretStore>,
}

impl ConnectorManager {
    /// Create a new connector reconciler.
    pub fn new(id: String, connectors: ConnectorsService, secrets: Arc<dyn SecretStore>) -> Self {
        Self {
            id,
            connectors,
            secrets,
        }
    }

    async fn reconcile_deleted(&self, connector: &Connector) -> Result<(), ServiceError> {
        // Soft delete commits first; only then is the vault touched.
        let secret_ref = self.connectors.delete(connector).await?;

        if let Some(secret_ref) = secret_ref
            && let Err(e) = self.secrets.delete_secret_string(&secret_ref).await
        {
            warn!(
                connector_id = %connector.id,
                secret_ref = %secret_ref,
                error = %e,
                "connector deleted but secret cleanup failed"
            );
            return Err(ServiceError::new(
                e.kind(),
                format!(
                    "failed to delete secret '{}' of connector '{}': {}",
                    secret_ref, connector.id, e
                ),
            ));
        }

        debug!(connector_id = %connector.id, "connector deleted");
        Ok(())
    }

    async fn converge_phase(
        &self,
        connector: &Connector,
        target: ConnectorStatus,
    ) -> Result<(), ServiceError> {
        let phase = connector.phase()?;
        if phase == target || phase == ConnectorStatus::Assigning {
            // Assigning connectors are still waiting for placement; phase
            // convergence starts once the data plane owns them.
            return Ok(());
        }
        self.connectors.save_status(&connector.id, target).await?;
        debug!(connector_id = %connector.id, target = %target, "connector phase converged");
        Ok(())
    }
}

#[async_trait]
impl Worker for ConnectorManager {
    fn id(&self) -> &str {
        &self.id
    }

    fn worker_type(&self) -> &'static str {
        "connector"
    }

    async fn reconcile(&self) -> Vec<ServiceError> {
        let mut errors = Vec::new();

        match self
            .connectors
            .list_by_desired_state(ConnectorDesiredState::Deleted)
            .await
        {
            Ok(deleted) => {
                debug!(count = deleted.len(), "reconciling connectors marked for deletion");
                for connector in deleted {
                    if let Err(e) = self.reconcile_deleted(&connector).await {
                        error!(connector_id = %connector.id, error = %e, "failed to reconcile deleted connector");
                        errors.push(e);
                    }
                }
            }
            Err(e) => errors.push(ServiceError::new(
                e.kind(),
                format!("failed to list connectors marked for deletion: {}", e),
            )),
        }

        for (desired, target) in [
            (ConnectorDesiredState::Ready, ConnectorStatus::Ready),
            (ConnectorDesiredState::Stopped, ConnectorStatus::Stopped),
        ] {
            match self.connectors.list_by_desired_state(desired).await {
                Ok(connectors) => {
                    for connector in connectors {
                        if let Err(e) = self.converge_phase(&connector, target).await {
                            error!(connector_id = %connector.id, error = %e, "failed to converge connector phase");
                            errors.push(e);
                        }
                    }
                }
                Err(e) => errors.push(ServiceError::new(
                    e.kind(),
                    format!("failed to list connectors with desired state '{}': {}", desired, e),
                )),
            }
        }

        errors
    }
}
