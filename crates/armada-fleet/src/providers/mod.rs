// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Consumed collaborator interfaces.
//!
//! The control plane talks to four external systems it does not own: the
//! quota/subscription provider, the data-plane cluster inventory, the secret
//! vault, and the remote shard operator that reports per-instance status
//! back. Each is a trait here so deployments can swap implementations; the
//! [`mock`] module provides programmable in-memory versions for tests and
//! development.
//!
//! Collaborators are PURE side-effect surfaces - they never touch the fleet
//! database. Persistence goes through the domain services.

pub mod mock;

pub use mock::{MockClusterService, MockDataPlane, MockQuotaService, MockSecretStore};

use async_trait::async_trait;

use armada_core::error::ServiceError;

/// A data-plane cluster known to the control plane.
#[derive(Debug, Clone)]
pub struct Cluster {
    /// Cluster identifier.
    pub cluster_id: String,
    /// Base DNS under which instance routes are created.
    pub cluster_dns: String,
    /// Instance types this cluster accepts.
    pub supported_instance_types: Vec<String>,
}

/// Quota/subscription provider.
#[async_trait]
pub trait QuotaService: Send + Sync {
    /// Release the quota held by a subscription.
    ///
    /// Must be idempotent: releasing an unknown or already-released
    /// subscription is a success.
    async fn delete_quota(&self, subscription_id: &str) -> Result<(), ServiceError>;
}

/// Data-plane cluster inventory and version capability queries.
#[async_trait]
pub trait ClusterService: Send + Sync {
    /// Look up a cluster by its identifier.
    async fn find_cluster_by_id(&self, cluster_id: &str)
    -> Result<Option<Cluster>, ServiceError>;

    /// Find a cluster with free capacity for the given instance type.
    async fn find_available_cluster(
        &self,
        instance_type: &str,
    ) -> Result<Option<Cluster>, ServiceError>;

    /// Whether the given version combination is installable on the cluster.
    async fn is_version_available_in_cluster(
        &self,
        cluster: &Cluster,
        strimzi_version: &str,
        kafka_version: &str,
        ibp_version: &str,
    ) -> Result<bool, ServiceError>;

    /// Whether the operator version is rolled out and ready on the cluster.
    async fn check_version_ready(
        &self,
        cluster: &Cluster,
        strimzi_version: &str,
    ) -> Result<bool, ServiceError>;
}

/// Secret vault for instance credentials.
///
/// Callers delete secrets strictly after the owning database transaction
/// commits, so a rolled-back record never loses its secret.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Store a secret value under a reference.
    async fn store_secret_string(&self, secret_ref: &str, value: &str)
    -> Result<(), ServiceError>;

    /// Delete the secret behind a reference. Idempotent.
    async fn delete_secret_string(&self, secret_ref: &str) -> Result<(), ServiceError>;
}

/// Instance state as reported by the remote shard operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteInstanceState {
    /// The operator is still rolling the instance out.
    Installing,
    /// The instance is up and serving.
    Ready,
    /// The instance failed permanently on the data plane.
    Failed,
    /// The instance is stopped (suspended).
    Suspended,
    /// The instance and its resources have been removed.
    Removed,
}

/// The remote shard operator's reported view of instances.
///
/// The operator watches desired state through the control plane API and
/// reports observed status back; reconcilers poll this view to confirm
/// remote transitions.
#[async_trait]
pub trait DataPlaneService: Send + Sync {
    /// The reported state of an instance on a cluster.
    ///
    /// `None` means the operator has no record of the instance - either it
    /// was never handed over, or its removal completed.
    async fn instance_status(
        &self,
        cluster_id: &str,
        instance_id: &str,
    ) -> Result<Option<RemoteInstanceState>, ServiceError>;
}
