// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Reconciler for the connector type catalog.
//!
//! Compares the configured catalog's checksums against the store. When out
//! of sync it upserts every entry - connector type, channel associations,
//! shard metadata revisions - then stamps the entry checksum, and finally
//! removes or deprecates types that left the catalog.

use std::sync::Arc;

use tracing::{debug, error};

use armada_core::error::ServiceError;

use crate::catalog::{CatalogEntry, ConnectorCatalog};
use crate::services::{ConnectorTypesService, ShardMetadataSpec};
use crate::workers::Worker;
use async_trait::async_trait;

/// Reconciler keeping the persisted catalog in sync with configuration.
pub struct ConnectorCatalogManager {
    id: String,
    types: ConnectorTypesService,
    catalog: Arc<ConnectorCatalog>,
}

impl ConnectorCatalogManager {
    /// Create a new catalog reconciler.
    pub fn new(id: String, types: ConnectorTypesService, catalog: Arc<ConnectorCatalog>) -> Self {
        Self { id, types, catalog }
    }

    async fn reconcile_entry(&self, entry: &CatalogEntry) -> Result<(), ServiceError> {
        let channels: Vec<String> = entry.channels.keys().cloned().collect();
        self.types
            .upsert_connector_type(&entry.connector_type, &channels)
            .await?;

        for (channel, definition) in &entry.channels {
            self.types
                .put_connector_shard_metadata(&ShardMetadataSpec {
                    connector_type_id: entry.connector_type.id.clone(),
                    channel: channel.clone(),
                    revision: definition.revision,
                    shard_metadata: definition.shard_metadata.clone(),
                })
                .await?;
        }

        // Stamp last: a crash before this leaves the checksum stale and the
        // next tick re-runs the (idempotent) upserts.
        self.types
            .update_checksum(&entry.connector_type.id, &entry.checksum())
            .await
    }
}

#[async_trait]
impl Worker for ConnectorCatalogManager {
    fn id(&self) -> &str {
        &self.id
    }

    fn worker_type(&self) -> &'static str {
        "connector_catalog"
    }

    async fn reconcile(&self) -> Vec<ServiceError> {
        let mut errors = Vec::new();

        if self.catalog.is_empty() {
            return errors;
        }

        match self
            .types
            .catalog_entries_reconciled(self.catalog.checksums())
            .await
        {
            Ok(true) => {
                debug!("connector catalog is up to date");
            }
            Ok(false) => {
                debug!(
                    entries = self.catalog.entries().len(),
                    "connector catalog out of sync, upserting entries"
                );
                for entry in self.catalog.entries() {
                    if let Err(e) = self.reconcile_entry(entry).await {
                        error!(
                            connector_type_id = %entry.connector_type.id,
                            error = %e,
                            "failed to reconcile catalog entry"
                        );
                        errors.push(e);
                    }
                }
            }
            Err(e) => {
                errors.push(ServiceError::new(
                    e.kind(),
                    format!("failed to compare catalog checksums: {}", e),
                ));
                return errors;
            }
        }

        if let Err(e) = self
            .types
            .delete_or_deprecate_removed_types(&self.catalog.type_ids())
            .await
        {
            errors.push(ServiceError::new(
                e.kind(),
                format!("failed to clean up removed connector types: {}", e),
            ));
        }

        errors
    }
}
