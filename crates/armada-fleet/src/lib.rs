// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Armada Fleet - Managed Instance Control Plane
//!
//! This crate is the reconciliation engine of the armada control plane. It
//! persists managed Kafka requests and connector workloads in PostgreSQL and
//! runs a set of background reconcilers that converge each record's actual
//! state toward its desired state, one lifecycle phase per reconciler.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     API / Admin handlers (external)                      │
//! │        create requests, PATCH suspend/resume, DELETE → deprovision       │
//! └─────────────────────────────────────────────────────────────────────────┘
//!                                    │ domain service calls
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        armada-fleet (This Crate)                         │
//! │  ┌──────────────┐  ┌───────────────┐  ┌──────────────┐  ┌────────────┐  │
//! │  │   Domain     │  │  Reconcilers  │  │   Worker     │  │   Leader   │  │
//! │  │   Services   │  │  (per phase)  │  │  Scheduler   │  │  Election  │  │
//! │  └──────────────┘  └───────────────┘  └──────────────┘  └────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//!        │                     │ quota / cluster / secrets / data plane
//!        ▼                     ▼
//! ┌───────────────┐   ┌─────────────────────────────────────────────────────┐
//! │  PostgreSQL   │   │  External collaborators (consumed interfaces only)  │
//! │ (source of    │   │  quota provider, cluster placement, secret vault,   │
//! │  truth)       │   │  remote shard operator reporting instance status    │
//! └───────────────┘   └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Reconcilers
//!
//! | Worker type | Owns | Transition |
//! |-------------|------|------------|
//! | `accepted_kafka` | cluster placement | accepted → preparing |
//! | `preparing_kafka` | endpoints + SSO credentials | preparing → provisioning |
//! | `provisioning_kafka` | remote readiness | provisioning → ready / failed |
//! | `suspend_resume_kafka` | remote confirmation | suspending → suspended, resuming → ready |
//! | `deprovisioning_kafka` | remote teardown | deprovision → deleting |
//! | `deleting_kafka` | quota release, soft delete, purge | deleting → deleted |
//! | `connector` | connector convergence + secret cleanup | desired_state → status |
//! | `connector_catalog` | catalog upserts + shard metadata | configuration → store |
//!
//! Each reconciler lists its candidate records on a fixed interval and
//! processes them sequentially; a record's failure is logged and aggregated
//! but never aborts the batch. Only the elected leader executes reconcile
//! logic; standby processes keep their timers armed and take over on
//! promotion. All transitions are idempotent, so reconcilers are safe to run
//! out of order relative to one another.
//!
//! # Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `ARMADA_DATABASE_URL` | Yes | - | PostgreSQL connection string |
//! | `ARMADA_RECONCILE_INTERVAL_SECS` | No | `30` | Reconciler poll interval |
//! | `ARMADA_CATALOG_INTERVAL_SECS` | No | `300` | Catalog reconcile interval |
//! | `ARMADA_DELETED_RETENTION_DAYS` | No | `30` | Days before soft-deleted rows are purged |
//! | `ARMADA_LEADER_LOCK_KEY` | No | `7446` | Advisory lock key for leader election |
//!
//! # Modules
//!
//! - [`catalog`]: Connector catalog file model, checksums, and entry builder
//! - [`config`]: Service configuration from environment variables
//! - [`metrics`]: Prometheus metrics for workers and reconcile outcomes
//! - [`migrations`]: sqlx migrations for the fleet schema
//! - [`providers`]: Consumed collaborator interfaces and their mocks
//! - [`runtime`]: Embeddable fleet runtime (builder / start / shutdown)
//! - [`services`]: Domain services over the persisted request store
//! - [`workers`]: Reconcilers, worker scheduler, and leader election

#![deny(missing_docs)]

/// Connector catalog file model, checksums, and catalog entry builder.
pub mod catalog;

/// Service configuration loaded from environment variables.
pub mod config;

/// Prometheus metrics for worker leadership and reconcile outcomes.
pub mod metrics;

/// Database migrations for the fleet schema.
pub mod migrations;

/// Consumed collaborator interfaces (quota, cluster, secrets, data plane).
pub mod providers;

/// Embeddable runtime wiring services, workers, and the scheduler.
pub mod runtime;

/// Domain services over the persisted request store.
pub mod services;

/// Reconcilers, the worker scheduler, and leader election.
pub mod workers;

pub use config::Config;
pub use runtime::FleetRuntime;
