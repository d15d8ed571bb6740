// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fleet configuration: instance types, billing models, and feature toggles.
//!
//! These types are deserialized from the deployment's fleet configuration
//! file and shared between the domain services and the reconcilers. The
//! grace period consulted by resume validation lives on the billing model.

use serde::{Deserialize, Serialize};

/// A billing model supported by an instance type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingModel {
    /// Billing model identifier (e.g. "standard", "eval").
    pub id: String,
    /// Days before an instance's expiry during which resume is refused.
    /// Zero means no grace window: resume is allowed right up to expiry.
    #[serde(default)]
    pub grace_period_days: i64,
}

/// A supported instance type and its billing models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceType {
    /// Instance type identifier (e.g. "standard", "developer").
    pub id: String,
    /// Billing models available for this instance type.
    #[serde(default)]
    pub supported_billing_models: Vec<BillingModel>,
}

/// Fleet-wide configuration consumed by services and reconcilers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetConfig {
    /// When true, accepted quota subscriptions are released on deletion.
    #[serde(default)]
    pub enable_quota_accounting: bool,
    /// When true, instances get SSO client credentials during preparation,
    /// and deprovisioning treats missing credentials as "never provisioned".
    #[serde(default)]
    pub enable_instance_authentication: bool,
    /// Instance types this deployment accepts.
    #[serde(default)]
    pub supported_instance_types: Vec<InstanceType>,
}

impl FleetConfig {
    /// Grace period (days) for the given instance type and billing model.
    ///
    /// Unknown combinations behave as an unconfigured grace period (zero),
    /// which lets resume succeed until the actual expiry.
    pub fn grace_period_days(&self, instance_type: &str, billing_model: &str) -> i64 {
        self.supported_instance_types
            .iter()
            .find(|it| it.id == instance_type)
            .and_then(|it| {
                it.supported_billing_models
                    .iter()
                    .find(|bm| bm.id == billing_model)
            })
            .map(|bm| bm.grace_period_days)
            .unwrap_or(0)
    }

    /// True if the instance type is supported by this deployment.
    pub fn supports_instance_type(&self, instance_type: &str) -> bool {
        self.supported_instance_types
            .iter()
            .any(|it| it.id == instance_type)
    }
}
