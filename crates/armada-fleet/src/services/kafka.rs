// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Kafka request store operations.
//!
//! The `kafka_requests` table is the source of truth for managed instances.
//! Rows are only ever mutated through this service; reconcilers list
//! candidates by status and persist the outcome of each phase here.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use armada_core::error::ServiceError;
use armada_core::status::KafkaStatus;

/// A managed Kafka request record.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KafkaRequest {
    /// Opaque unique identifier, immutable once assigned.
    pub id: String,
    /// Human-readable instance name.
    pub name: String,
    /// Requesting user.
    pub owner: String,
    /// Owning organisation.
    pub organisation_id: String,
    /// Instance type (e.g. "standard", "developer").
    pub instance_type: String,
    /// Billing model the instance runs under.
    pub billing_model: String,
    /// Current lifecycle status (see [`KafkaStatus`]).
    pub status: String,
    /// Data-plane cluster the instance is placed on.
    pub cluster_id: Option<String>,
    /// Placement identifier on the assigned cluster.
    pub placement_id: Option<String>,
    /// External quota subscription backing the instance.
    pub subscription_id: Option<String>,
    /// Bootstrap endpoint exposed to clients.
    pub bootstrap_server_host: Option<String>,
    /// Admin API endpoint.
    pub admin_api_server_url: Option<String>,
    /// SSO client identifier (when instance authentication is enabled).
    pub sso_client_id: Option<String>,
    /// Vault reference of the SSO client secret.
    pub sso_client_secret_ref: Option<String>,
    /// Desired Kafka version.
    pub desired_kafka_version: Option<String>,
    /// Observed Kafka version.
    pub actual_kafka_version: Option<String>,
    /// Desired Strimzi operator version.
    pub desired_strimzi_version: Option<String>,
    /// Observed Strimzi operator version.
    pub actual_strimzi_version: Option<String>,
    /// Desired inter-broker protocol version.
    pub desired_kafka_ibp_version: Option<String>,
    /// Observed inter-broker protocol version.
    pub actual_kafka_ibp_version: Option<String>,
    /// True while a Kafka version upgrade is in flight.
    pub kafka_upgrading: bool,
    /// True while a Strimzi version upgrade is in flight.
    pub strimzi_upgrading: bool,
    /// True while an IBP version upgrade is in flight.
    pub kafka_ibp_upgrading: bool,
    /// When the instance expires (suspension/removal driven by billing).
    pub expires_at: Option<DateTime<Utc>>,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
    /// When the request was last mutated.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker; set rows are invisible to all listings.
    pub deleted_at: Option<DateTime<Utc>>,
}

fn is_set(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.is_empty())
}

impl KafkaRequest {
    /// Parse the status column.
    pub fn lifecycle_status(&self) -> Result<KafkaStatus, ServiceError> {
        self.status.parse()
    }

    /// Whether this request was actually handed to a data-plane cluster.
    ///
    /// A request without a bootstrap host was never provisioned. When
    /// instance authentication is enabled, missing SSO client credentials
    /// equally mean provisioning never happened.
    pub fn was_provisioned(&self, auth_enabled: bool) -> bool {
        if !is_set(&self.bootstrap_server_host) {
            return false;
        }
        if auth_enabled && (!is_set(&self.sso_client_id) || !is_set(&self.sso_client_secret_ref)) {
            return false;
        }
        true
    }
}

/// Fields for creating a new Kafka request.
#[derive(Debug, Clone)]
pub struct NewKafkaRequest {
    /// Instance name.
    pub name: String,
    /// Requesting user.
    pub owner: String,
    /// Owning organisation.
    pub organisation_id: String,
    /// Instance type.
    pub instance_type: String,
    /// Billing model.
    pub billing_model: String,
    /// Desired Kafka version, if pinned at creation.
    pub desired_kafka_version: Option<String>,
    /// Desired Strimzi version, if pinned at creation.
    pub desired_strimzi_version: Option<String>,
    /// Desired IBP version, if pinned at creation.
    pub desired_kafka_ibp_version: Option<String>,
    /// Expiry timestamp (eval/trial billing models).
    pub expires_at: Option<DateTime<Utc>>,
}

/// Expand a status filter into column values, resolving the legacy alias.
///
/// `deleted` rows written by older deployments are semantically `deleting`,
/// so a `deleting` filter matches both.
fn status_filter_values(statuses: &[KafkaStatus]) -> Vec<&'static str> {
    let mut values: Vec<&'static str> = Vec::with_capacity(statuses.len() + 1);
    for status in statuses {
        values.push(status.as_str());
        if *status == KafkaStatus::Deleting && !values.contains(&KafkaStatus::Deleted.as_str()) {
            values.push(KafkaStatus::Deleted.as_str());
        }
    }
    values.dedup();
    values
}

const KAFKA_COLUMNS: &str = "id, name, owner, organisation_id, instance_type, billing_model, \
     status, cluster_id, placement_id, subscription_id, bootstrap_server_host, \
     admin_api_server_url, sso_client_id, sso_client_secret_ref, \
     desired_kafka_version, actual_kafka_version, desired_strimzi_version, \
     actual_strimzi_version, desired_kafka_ibp_version, actual_kafka_ibp_version, \
     kafka_upgrading, strimzi_upgrading, kafka_ibp_upgrading, expires_at, \
     created_at, updated_at, deleted_at";

/// Store service for managed Kafka requests.
#[derive(Clone)]
pub struct KafkaService {
    pool: PgPool,
}

impl KafkaService {
    /// Create a new service over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist a new request in `accepted` status.
    pub async fn create(&self, new: &NewKafkaRequest) -> Result<KafkaRequest, ServiceError> {
        let id = Uuid::new_v4().to_string();
        let query = format!(
            r#"
            INSERT INTO kafka_requests
                (id, name, owner, organisation_id, instance_type, billing_model, status,
                 desired_kafka_version, desired_strimzi_version, desired_kafka_ibp_version,
                 expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {KAFKA_COLUMNS}
            "#
        );
        let kafka = sqlx::query_as::<_, KafkaRequest>(&query)
            .bind(&id)
            .bind(&new.name)
            .bind(&new.owner)
            .bind(&new.organisation_id)
            .bind(&new.instance_type)
            .bind(&new.billing_model)
            .bind(KafkaStatus::Accepted.as_str())
            .bind(new.desired_kafka_version.as_deref())
            .bind(new.desired_strimzi_version.as_deref())
            .bind(new.desired_kafka_ibp_version.as_deref())
            .bind(new.expires_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(kafka)
    }

    /// Get a request by id. Soft-deleted rows are not found.
    pub async fn get(&self, id: &str) -> Result<KafkaRequest, ServiceError> {
        let query = format!(
            "SELECT {KAFKA_COLUMNS} FROM kafka_requests WHERE id = $1 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, KafkaRequest>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("kafka request '{}' not found", id)))
    }

    /// List requests in any of the given statuses, oldest first.
    pub async fn list_by_status(
        &self,
        statuses: &[KafkaStatus],
    ) -> Result<Vec<KafkaRequest>, ServiceError> {
        let values = status_filter_values(statuses);
        let query = format!(
            "SELECT {KAFKA_COLUMNS} FROM kafka_requests \
             WHERE status = ANY($1) AND deleted_at IS NULL \
             ORDER BY created_at ASC"
        );
        let rows = sqlx::query_as::<_, KafkaRequest>(&query)
            .bind(&values)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Persist the mutable fields of a request.
    pub async fn update(&self, kafka: &KafkaRequest) -> Result<(), ServiceError> {
        let result = sqlx::query(
            r#"
            UPDATE kafka_requests
            SET status = $2,
                cluster_id = $3,
                placement_id = $4,
                subscription_id = $5,
                bootstrap_server_host = $6,
                admin_api_server_url = $7,
                sso_client_id = $8,
                sso_client_secret_ref = $9,
                desired_kafka_version = $10,
                actual_kafka_version = $11,
                desired_strimzi_version = $12,
                actual_strimzi_version = $13,
                desired_kafka_ibp_version = $14,
                actual_kafka_ibp_version = $15,
                kafka_upgrading = $16,
                strimzi_upgrading = $17,
                kafka_ibp_upgrading = $18,
                expires_at = $19,
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(&kafka.id)
        .bind(&kafka.status)
        .bind(kafka.cluster_id.as_deref())
        .bind(kafka.placement_id.as_deref())
        .bind(kafka.subscription_id.as_deref())
        .bind(kafka.bootstrap_server_host.as_deref())
        .bind(kafka.admin_api_server_url.as_deref())
        .bind(kafka.sso_client_id.as_deref())
        .bind(kafka.sso_client_secret_ref.as_deref())
        .bind(kafka.desired_kafka_version.as_deref())
        .bind(kafka.actual_kafka_version.as_deref())
        .bind(kafka.desired_strimzi_version.as_deref())
        .bind(kafka.actual_strimzi_version.as_deref())
        .bind(kafka.desired_kafka_ibp_version.as_deref())
        .bind(kafka.actual_kafka_ibp_version.as_deref())
        .bind(kafka.kafka_upgrading)
        .bind(kafka.strimzi_upgrading)
        .bind(kafka.kafka_ibp_upgrading)
        .bind(kafka.expires_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::not_found(format!(
                "kafka request '{}' not found",
                kafka.id
            )));
        }
        Ok(())
    }

    /// Persist only a status change.
    pub async fn save_status(&self, id: &str, status: KafkaStatus) -> Result<(), ServiceError> {
        let result = sqlx::query(
            "UPDATE kafka_requests SET status = $2, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::not_found(format!(
                "kafka request '{}' not found",
                id
            )));
        }
        Ok(())
    }

    /// Mark a request for deprovisioning (the DELETE entry point).
    ///
    /// Idempotent: requests already on the teardown path are left untouched
    /// and the call succeeds.
    pub async fn register_deprovision_job(&self, id: &str) -> Result<(), ServiceError> {
        let kafka = self.get(id).await?;
        if kafka.lifecycle_status()?.is_deletion_in_progress() {
            return Ok(());
        }
        self.save_status(id, KafkaStatus::Deprovision).await
    }

    /// Soft-delete a request: terminal status plus the `deleted_at` marker.
    ///
    /// Idempotent: deleting an already-deleted request is a no-op success.
    pub async fn delete(&self, kafka: &KafkaRequest) -> Result<(), ServiceError> {
        sqlx::query(
            "UPDATE kafka_requests \
             SET status = $2, deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(&kafka.id)
        .bind(KafkaStatus::Deleted.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Physically remove soft-deleted rows past the retention window.
    ///
    /// Returns the number of purged rows.
    pub async fn purge_soft_deleted(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<u64, ServiceError> {
        let result = sqlx::query(
            "DELETE FROM kafka_requests WHERE deleted_at IS NOT NULL AND deleted_at < $1",
        )
        .bind(older_than)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
