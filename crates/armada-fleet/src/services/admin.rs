// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Admin update flow for Kafka requests.
//!
//! The external PATCH handler deserializes its body into
//! [`KafkaAdminUpdate`] - an explicit whitelist of the fields a client may
//! mutate - and calls [`AdminKafkaService::update`]. Fields equal to the
//! current desired value are treated as effective no-ops.

use std::sync::Arc;

use chrono::Utc;

use armada_core::config::FleetConfig;
use armada_core::error::ServiceError;
use armada_core::status::{validate_resume, validate_suspend, validate_version_change};

use crate::providers::ClusterService;
use crate::services::{KafkaRequest, KafkaService};

/// Whitelisted admin-mutable fields of a Kafka request.
#[derive(Debug, Clone, Default)]
pub struct KafkaAdminUpdate {
    /// New desired Kafka version.
    pub kafka_version: Option<String>,
    /// New desired Strimzi operator version.
    pub strimzi_version: Option<String>,
    /// New desired inter-broker protocol version.
    pub kafka_ibp_version: Option<String>,
    /// Suspension toggle: `true` suspends, `false` resumes.
    pub suspended: Option<bool>,
}

/// Validated admin updates over the Kafka request store.
pub struct AdminKafkaService {
    kafkas: KafkaService,
    clusters: Arc<dyn ClusterService>,
    fleet_config: Arc<FleetConfig>,
}

impl AdminKafkaService {
    /// Create a new admin service.
    pub fn new(
        kafkas: KafkaService,
        clusters: Arc<dyn ClusterService>,
        fleet_config: Arc<FleetConfig>,
    ) -> Self {
        Self {
            kafkas,
            clusters,
            fleet_config,
        }
    }

    /// Apply an admin update, enforcing the transition rules.
    ///
    /// Version changes require the corresponding upgrade track to be idle
    /// and the new combination to be available and ready on the assigned
    /// cluster. Suspension is only legal from `ready`; resume only from
    /// `suspended` and outside the expiry grace window. Returns the updated
    /// record.
    pub async fn update(
        &self,
        id: &str,
        update: &KafkaAdminUpdate,
    ) -> Result<KafkaRequest, ServiceError> {
        let mut kafka = self.kafkas.get(id).await?;
        let status = kafka.lifecycle_status()?;

        let mut version_changed = false;

        if let Some(requested) = &update.kafka_version {
            let changed = validate_version_change(
                "kafka",
                status,
                kafka.kafka_upgrading,
                kafka.desired_kafka_version.as_deref().unwrap_or_default(),
                requested,
            )?;
            if changed {
                kafka.desired_kafka_version = Some(requested.clone());
                kafka.kafka_upgrading = true;
                version_changed = true;
            }
        }

        if let Some(requested) = &update.strimzi_version {
            let changed = validate_version_change(
                "strimzi",
                status,
                kafka.strimzi_upgrading,
                kafka.desired_strimzi_version.as_deref().unwrap_or_default(),
                requested,
            )?;
            if changed {
                kafka.desired_strimzi_version = Some(requested.clone());
                kafka.strimzi_upgrading = true;
                version_changed = true;
            }
        }

        if let Some(requested) = &update.kafka_ibp_version {
            let changed = validate_version_change(
                "ibp",
                status,
                kafka.kafka_ibp_upgrading,
                kafka
                    .desired_kafka_ibp_version
                    .as_deref()
                    .unwrap_or_default(),
                requested,
            )?;
            if changed {
                kafka.desired_kafka_ibp_version = Some(requested.clone());
                kafka.kafka_ibp_upgrading = true;
                version_changed = true;
            }
        }

        if version_changed {
            self.verify_versions_on_cluster(&kafka).await?;
        }

        if let Some(suspended) = update.suspended {
            let next = if suspended {
                validate_suspend(status)?
            } else {
                let grace_period_days = self
                    .fleet_config
                    .grace_period_days(&kafka.instance_type, &kafka.billing_model);
                validate_resume(status, kafka.expires_at, grace_period_days, Utc::now())?
            };
            kafka.status = next.as_str().to_string();
        }

        self.kafkas.update(&kafka).await?;
        Ok(kafka)
    }

    /// Check the desired version combination against the assigned cluster.
    async fn verify_versions_on_cluster(&self, kafka: &KafkaRequest) -> Result<(), ServiceError> {
        let cluster_id = kafka.cluster_id.as_deref().ok_or_else(|| {
            ServiceError::validation(format!(
                "kafka request '{}' is not assigned to a cluster",
                kafka.id
            ))
        })?;

        let cluster = self
            .clusters
            .find_cluster_by_id(cluster_id)
            .await?
            .ok_or_else(|| {
                ServiceError::general(format!("cluster '{}' not found", cluster_id))
            })?;

        let strimzi = kafka.desired_strimzi_version.as_deref().unwrap_or_default();
        let kafka_version = kafka.desired_kafka_version.as_deref().unwrap_or_default();
        let ibp = kafka
            .desired_kafka_ibp_version
            .as_deref()
            .unwrap_or_default();

        let available = self
            .clusters
            .is_version_available_in_cluster(&cluster, strimzi, kafka_version, ibp)
            .await?;
        if !available {
            return Err(ServiceError::validation(format!(
                "requested version combination (strimzi '{}', kafka '{}', ibp '{}') \
                 is not available in cluster '{}'",
                strimzi, kafka_version, ibp, cluster.cluster_id
            )));
        }

        if !strimzi.is_empty() {
            let ready = self.clusters.check_version_ready(&cluster, strimzi).await?;
            if !ready {
                return Err(ServiceError::validation(format!(
                    "strimzi version '{}' is not ready in cluster '{}'",
                    strimzi, cluster.cluster_id
                )));
            }
        }

        Ok(())
    }
}
