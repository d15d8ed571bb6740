// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock collaborator implementations for tests and development.
//!
//! Each mock records the calls it receives and can be programmed to fail,
//! so reconciler tests can assert side effects and partial-failure
//! isolation without external systems.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use armada_core::error::ServiceError;

use super::{Cluster, ClusterService, DataPlaneService, QuotaService, RemoteInstanceState, SecretStore};

/// Mock quota provider recording released subscriptions.
#[derive(Default)]
pub struct MockQuotaService {
    deleted: Mutex<Vec<String>>,
    fail_for: Mutex<HashSet<String>>,
}

impl MockQuotaService {
    /// Create a new mock quota provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `delete_quota` fail for the given subscription.
    pub fn fail_for(&self, subscription_id: &str) {
        self.fail_for
            .lock()
            .unwrap()
            .insert(subscription_id.to_string());
    }

    /// Subscriptions released so far, in call order.
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuotaService for MockQuotaService {
    async fn delete_quota(&self, subscription_id: &str) -> Result<(), ServiceError> {
        if self.fail_for.lock().unwrap().contains(subscription_id) {
            return Err(ServiceError::general(format!(
                "quota backend unavailable for subscription {}",
                subscription_id
            )));
        }
        self.deleted
            .lock()
            .unwrap()
            .push(subscription_id.to_string());
        Ok(())
    }
}

/// Mock cluster inventory with a fixed cluster list and programmable
/// version answers.
pub struct MockClusterService {
    clusters: Mutex<Vec<Cluster>>,
    version_available: AtomicBool,
    version_ready: AtomicBool,
}

impl Default for MockClusterService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClusterService {
    /// Create an empty inventory answering "yes" to version queries.
    pub fn new() -> Self {
        Self {
            clusters: Mutex::new(Vec::new()),
            version_available: AtomicBool::new(true),
            version_ready: AtomicBool::new(true),
        }
    }

    /// Create an inventory with a single ready cluster.
    pub fn with_cluster(cluster_id: &str, cluster_dns: &str) -> Self {
        let mock = Self::new();
        mock.add_cluster(Cluster {
            cluster_id: cluster_id.to_string(),
            cluster_dns: cluster_dns.to_string(),
            supported_instance_types: vec!["standard".to_string(), "developer".to_string()],
        });
        mock
    }

    /// Add a cluster to the inventory.
    pub fn add_cluster(&self, cluster: Cluster) {
        self.clusters.lock().unwrap().push(cluster);
    }

    /// Program the answer of `is_version_available_in_cluster`.
    pub fn set_version_available(&self, available: bool) {
        self.version_available.store(available, Ordering::SeqCst);
    }

    /// Program the answer of `check_version_ready`.
    pub fn set_version_ready(&self, ready: bool) {
        self.version_ready.store(ready, Ordering::SeqCst);
    }
}

#[async_trait]
impl ClusterService for MockClusterService {
    async fn find_cluster_by_id(
        &self,
        cluster_id: &str,
    ) -> Result<Option<Cluster>, ServiceError> {
        Ok(self
            .clusters
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.cluster_id == cluster_id)
            .cloned())
    }

    async fn find_available_cluster(
        &self,
        instance_type: &str,
    ) -> Result<Option<Cluster>, ServiceError> {
        Ok(self
            .clusters
            .lock()
            .unwrap()
            .iter()
            .find(|c| {
                c.supported_instance_types
                    .iter()
                    .any(|t| t == instance_type)
            })
            .cloned())
    }

    async fn is_version_available_in_cluster(
        &self,
        _cluster: &Cluster,
        _strimzi_version: &str,
        _kafka_version: &str,
        _ibp_version: &str,
    ) -> Result<bool, ServiceError> {
        Ok(self.version_available.load(Ordering::SeqCst))
    }

    async fn check_version_ready(
        &self,
        _cluster: &Cluster,
        _strimzi_version: &str,
    ) -> Result<bool, ServiceError> {
        Ok(self.version_ready.load(Ordering::SeqCst))
    }
}

/// In-memory secret vault recording stores and deletes.
#[derive(Default)]
pub struct MockSecretStore {
    secrets: Mutex<HashMap<String, String>>,
    deleted: Mutex<Vec<String>>,
}

impl MockSecretStore {
    /// Create an empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if a secret exists for the reference.
    pub fn contains(&self, secret_ref: &str) -> bool {
        self.secrets.lock().unwrap().contains_key(secret_ref)
    }

    /// References deleted so far, in call order.
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl SecretStore for MockSecretStore {
    async fn store_secret_string(
        &self,
        secret_ref: &str,
        value: &str,
    ) -> Result<(), ServiceError> {
        self.secrets
            .lock()
            .unwrap()
            .insert(secret_ref.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_secret_string(&self, secret_ref: &str) -> Result<(), ServiceError> {
        self.secrets.lock().unwrap().remove(secret_ref);
        self.deleted.lock().unwrap().push(secret_ref.to_string());
        Ok(())
    }
}

/// Mock shard operator view with per-instance programmable states.
#[derive(Default)]
pub struct MockDataPlane {
    states: Mutex<HashMap<String, RemoteInstanceState>>,
}

impl MockDataPlane {
    /// Create an empty view (no instances reported).
    pub fn new() -> Self {
        Self::default()
    }

    /// Program the reported state for an instance.
    pub fn set_state(&self, instance_id: &str, state: RemoteInstanceState) {
        self.states
            .lock()
            .unwrap()
            .insert(instance_id.to_string(), state);
    }

    /// Drop an instance from the reported view.
    pub fn remove(&self, instance_id: &str) {
        self.states.lock().unwrap().remove(instance_id);
    }
}

#[async_trait]
impl DataPlaneService for MockDataPlane {
    async fn instance_status(
        &self,
        _cluster_id: &str,
        instance_id: &str,
    ) -> Result<Option<RemoteInstanceState>, ServiceError> {
        Ok(self.states.lock().unwrap().get(instance_id).copied())
    }
}
