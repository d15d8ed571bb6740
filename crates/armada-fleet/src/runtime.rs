// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Embeddable runtime for armada-fleet.
//!
//! [`FleetRuntime`] wires the domain services, the per-phase reconcilers,
//! and the worker scheduler into a host application's tokio runtime.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use armada_fleet::runtime::FleetRuntime;
//! use armada_fleet::providers::{MockClusterService, MockDataPlane, MockQuotaService, MockSecretStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = sqlx::PgPool::connect("postgres://...").await?;
//!     armada_fleet::migrations::run(&pool).await?;
//!
//!     let runtime = FleetRuntime::builder()
//!         .pool(pool)
//!         .quotas(Arc::new(MockQuotaService::new()))
//!         .clusters(Arc::new(MockClusterService::with_cluster("c1", "kafka.example.com")))
//!         .secrets(Arc::new(MockSecretStore::new()))
//!         .data_plane(Arc::new(MockDataPlane::new()))
//!         .build()?
//!         .start();
//!
//!     // ... serve the API using runtime.kafkas() / runtime.admin() ...
//!
//!     runtime.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use armada_core::config::FleetConfig;

use crate::catalog::ConnectorCatalog;
use crate::providers::{ClusterService, DataPlaneService, QuotaService, SecretStore};
use crate::services::{
    AdminKafkaService, ConnectorTypesService, ConnectorsService, KafkaService,
};
use crate::workers::leader::{LeaderElection, PgAdvisoryLeader};
use crate::workers::scheduler::{Scheduler, SchedulerHandle};
use crate::workers::{
    AcceptedKafkaManager, ConnectorCatalogManager, ConnectorManager, DeletingKafkaManager,
    DeprovisioningKafkaManager, PreparingKafkaManager, ProvisioningKafkaManager,
    SuspendResumeKafkaManager,
};

/// Builder for creating a [`FleetRuntime`].
pub struct FleetRuntimeBuilder {
    pool: Option<PgPool>,
    quotas: Option<Arc<dyn QuotaService>>,
    clusters: Option<Arc<dyn ClusterService>>,
    secrets: Option<Arc<dyn SecretStore>>,
    data_plane: Option<Arc<dyn DataPlaneService>>,
    leader: Option<Arc<dyn LeaderElection>>,
    fleet_config: FleetConfig,
    catalog: ConnectorCatalog,
    reconcile_interval: Duration,
    catalog_interval: Duration,
    deleted_retention: Duration,
    leader_lock_key: i64,
}

impl Default for FleetRuntimeBuilder {
    fn default() -> Self {
        Self {
            pool: None,
            quotas: None,
            clusters: None,
            secrets: None,
            data_plane: None,
            leader: None,
            fleet_config: FleetConfig::default(),
            catalog: ConnectorCatalog::default(),
            reconcile_interval: Duration::from_secs(30),
            catalog_interval: Duration::from_secs(300),
            deleted_retention: Duration::from_secs(30 * 24 * 3600),
            leader_lock_key: 7446,
        }
    }
}

impl FleetRuntimeBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the PostgreSQL connection pool (required).
    pub fn pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Set the quota provider (required).
    pub fn quotas(mut self, quotas: Arc<dyn QuotaService>) -> Self {
        self.quotas = Some(quotas);
        self
    }

    /// Set the cluster inventory (required).
    pub fn clusters(mut self, clusters: Arc<dyn ClusterService>) -> Self {
        self.clusters = Some(clusters);
        self
    }

    /// Set the secret vault (required).
    pub fn secrets(mut self, secrets: Arc<dyn SecretStore>) -> Self {
        self.secrets = Some(secrets);
        self
    }

    /// Set the remote shard operator view (required).
    pub fn data_plane(mut self, data_plane: Arc<dyn DataPlaneService>) -> Self {
        self.data_plane = Some(data_plane);
        self
    }

    /// Override leader election.
    ///
    /// Default: a PostgreSQL advisory lock on the configured key.
    pub fn leader(mut self, leader: Arc<dyn LeaderElection>) -> Self {
        self.leader = Some(leader);
        self
    }

    /// Set the fleet configuration (instance types, feature toggles).
    pub fn fleet_config(mut self, fleet_config: FleetConfig) -> Self {
        self.fleet_config = fleet_config;
        self
    }

    /// Set the desired connector catalog.
    pub fn catalog(mut self, catalog: ConnectorCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Set the lifecycle reconciler poll interval.
    ///
    /// Default: 30 seconds
    pub fn reconcile_interval(mut self, interval: Duration) -> Self {
        self.reconcile_interval = interval;
        self
    }

    /// Set the catalog reconciler poll interval.
    ///
    /// Default: 5 minutes
    pub fn catalog_interval(mut self, interval: Duration) -> Self {
        self.catalog_interval = interval;
        self
    }

    /// Set the retention window for soft-deleted rows.
    ///
    /// Default: 30 days
    pub fn deleted_retention(mut self, retention: Duration) -> Self {
        self.deleted_retention = retention;
        self
    }

    /// Set the advisory lock key used by the default leader election.
    ///
    /// Default: 7446
    pub fn leader_lock_key(mut self, key: i64) -> Self {
        self.leader_lock_key = key;
        self
    }

    /// Build the runtime configuration.
    ///
    /// Returns an error if required fields are missing.
    pub fn build(self) -> Result<FleetRuntimeConfig> {
        let pool = self.pool.ok_or_else(|| anyhow::anyhow!("pool is required"))?;
        let quotas = self
            .quotas
            .ok_or_else(|| anyhow::anyhow!("quotas is required"))?;
        let clusters = self
            .clusters
            .ok_or_else(|| anyhow::anyhow!("clusters is required"))?;
        let secrets = self
            .secrets
            .ok_or_else(|| anyhow::anyhow!("secrets is required"))?;
        let data_plane = self
            .data_plane
            .ok_or_else(|| anyhow::anyhow!("data_plane is required"))?;
        let leader = self.leader.unwrap_or_else(|| {
            Arc::new(PgAdvisoryLeader::new(pool.clone(), self.leader_lock_key))
        });

        Ok(FleetRuntimeConfig {
            pool,
            quotas,
            clusters,
            secrets,
            data_plane,
            leader,
            fleet_config: Arc::new(self.fleet_config),
            catalog: Arc::new(self.catalog),
            reconcile_interval: self.reconcile_interval,
            catalog_interval: self.catalog_interval,
            deleted_retention: self.deleted_retention,
        })
    }
}

/// Configuration for a [`FleetRuntime`].
pub struct FleetRuntimeConfig {
    pool: PgPool,
    quotas: Arc<dyn QuotaService>,
    clusters: Arc<dyn ClusterService>,
    secrets: Arc<dyn SecretStore>,
    data_plane: Arc<dyn DataPlaneService>,
    leader: Arc<dyn LeaderElection>,
    fleet_config: Arc<FleetConfig>,
    catalog: Arc<ConnectorCatalog>,
    reconcile_interval: Duration,
    catalog_interval: Duration,
    deleted_retention: Duration,
}

impl FleetRuntimeConfig {
    /// Start the runtime, spawning one timer loop per reconciler.
    pub fn start(self) -> FleetRuntime {
        let kafkas = KafkaService::new(self.pool.clone());
        let connectors = ConnectorsService::new(self.pool.clone());
        let connector_types = ConnectorTypesService::new(self.pool.clone());
        let admin = AdminKafkaService::new(
            kafkas.clone(),
            self.clusters.clone(),
            self.fleet_config.clone(),
        );

        let mut scheduler = Scheduler::new(self.leader);

        scheduler.register(
            Arc::new(AcceptedKafkaManager::new(
                Uuid::new_v4().to_string(),
                kafkas.clone(),
                self.clusters.clone(),
            )),
            self.reconcile_interval,
        );
        scheduler.register(
            Arc::new(PreparingKafkaManager::new(
                Uuid::new_v4().to_string(),
                kafkas.clone(),
                self.clusters.clone(),
                self.secrets.clone(),
                self.fleet_config.clone(),
            )),
            self.reconcile_interval,
        );
        scheduler.register(
            Arc::new(ProvisioningKafkaManager::new(
                Uuid::new_v4().to_string(),
                kafkas.clone(),
                self.data_plane.clone(),
            )),
            self.reconcile_interval,
        );
        scheduler.register(
            Arc::new(SuspendResumeKafkaManager::new(
                Uuid::new_v4().to_string(),
                kafkas.clone(),
                self.data_plane.clone(),
            )),
            self.reconcile_interval,
        );
        scheduler.register(
            Arc::new(DeprovisioningKafkaManager::new(
                Uuid::new_v4().to_string(),
                kafkas.clone(),
                self.data_plane.clone(),
                self.fleet_config.clone(),
            )),
            self.reconcile_interval,
        );
        scheduler.register(
            Arc::new(DeletingKafkaManager::new(
                Uuid::new_v4().to_string(),
                kafkas.clone(),
                self.quotas.clone(),
                self.fleet_config.clone(),
                self.deleted_retention,
            )),
            self.reconcile_interval,
        );
        scheduler.register(
            Arc::new(ConnectorManager::new(
                Uuid::new_v4().to_string(),
                connectors.clone(),
                self.secrets.clone(),
            )),
            self.reconcile_interval,
        );
        scheduler.register(
            Arc::new(ConnectorCatalogManager::new(
                Uuid::new_v4().to_string(),
                connector_types.clone(),
                self.catalog.clone(),
            )),
            self.catalog_interval,
        );

        let scheduler = scheduler.start();

        info!(
            reconcile_interval_secs = self.reconcile_interval.as_secs(),
            catalog_interval_secs = self.catalog_interval.as_secs(),
            "FleetRuntime started"
        );

        FleetRuntime {
            scheduler,
            kafkas,
            connectors,
            connector_types,
            admin,
        }
    }
}

/// A running fleet control plane that can be embedded in an application.
///
/// The runtime owns the worker scheduler and exposes the domain services
/// the (external) API layer calls synchronously. Call
/// [`shutdown`](Self::shutdown) for graceful termination.
pub struct FleetRuntime {
    scheduler: SchedulerHandle,
    kafkas: KafkaService,
    connectors: ConnectorsService,
    connector_types: ConnectorTypesService,
    admin: AdminKafkaService,
}

impl FleetRuntime {
    /// Create a new builder for configuring the runtime.
    pub fn builder() -> FleetRuntimeBuilder {
        FleetRuntimeBuilder::new()
    }

    /// The Kafka request service.
    pub fn kafkas(&self) -> &KafkaService {
        &self.kafkas
    }

    /// The connector service.
    pub fn connectors(&self) -> &ConnectorsService {
        &self.connectors
    }

    /// The connector catalog service.
    pub fn connector_types(&self) -> &ConnectorTypesService {
        &self.connector_types
    }

    /// The validated admin update service.
    pub fn admin(&self) -> &AdminKafkaService {
        &self.admin
    }

    /// Check if the runtime is still running.
    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Gracefully shut down all reconcilers.
    pub async fn shutdown(self) {
        info!("FleetRuntime shutting down...");
        self.scheduler.shutdown().await;
        info!("FleetRuntime shutdown complete");
    }
}
