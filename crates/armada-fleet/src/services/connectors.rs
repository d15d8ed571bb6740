// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Connector workload store operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use armada_core::error::ServiceError;
use armada_core::status::{ConnectorDesiredState, ConnectorStatus};

/// A connector workload record.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Connector {
    /// Opaque unique identifier.
    pub id: String,
    /// Human-readable connector name.
    pub name: String,
    /// Requesting user.
    pub owner: String,
    /// Owning organisation.
    pub organisation_id: String,
    /// Catalog type this connector instantiates.
    pub connector_type_id: String,
    /// Distribution channel of the type.
    pub channel: String,
    /// Client-requested desired state (ready, stopped, deleted).
    pub desired_state: String,
    /// Observed phase.
    pub status: String,
    /// Kafka instance the connector is attached to.
    pub kafka_id: Option<String>,
    /// Vault reference of the connector's configuration secret.
    pub secret_ref: Option<String>,
    /// When the connector was created.
    pub created_at: DateTime<Utc>,
    /// When the connector was last mutated.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Connector {
    /// Parse the desired-state column.
    pub fn desired(&self) -> Result<ConnectorDesiredState, ServiceError> {
        self.desired_state.parse()
    }

    /// Parse the status column.
    pub fn phase(&self) -> Result<ConnectorStatus, ServiceError> {
        self.status.parse()
    }
}

/// Fields for creating a new connector.
#[derive(Debug, Clone)]
pub struct NewConnector {
    /// Connector name.
    pub name: String,
    /// Requesting user.
    pub owner: String,
    /// Owning organisation.
    pub organisation_id: String,
    /// Catalog type id.
    pub connector_type_id: String,
    /// Distribution channel.
    pub channel: String,
    /// Initial desired state ("ready" unless the client says otherwise).
    pub desired_state: ConnectorDesiredState,
    /// Kafka instance to attach to.
    pub kafka_id: Option<String>,
    /// Vault reference of the configuration secret.
    pub secret_ref: Option<String>,
}

const CONNECTOR_COLUMNS: &str = "id, name, owner, organisation_id, connector_type_id, channel, \
     desired_state, status, kafka_id, secret_ref, created_at, updated_at, deleted_at";

/// Store service for connector workloads.
#[derive(Clone)]
pub struct ConnectorsService {
    pool: PgPool,
}

impl ConnectorsService {
    /// Create a new service over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist a new connector in `assigning` status.
    pub async fn create(&self, new: &NewConnector) -> Result<Connector, ServiceError> {
        let id = Uuid::new_v4().to_string();
        let query = format!(
            r#"
            INSERT INTO connectors
                (id, name, owner, organisation_id, connector_type_id, channel,
                 desired_state, status, kafka_id, secret_ref)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {CONNECTOR_COLUMNS}
            "#
        );
        let connector = sqlx::query_as::<_, Connector>(&query)
            .bind(&id)
            .bind(&new.name)
            .bind(&new.owner)
            .bind(&new.organisation_id)
            .bind(&new.connector_type_id)
            .bind(&new.channel)
            .bind(new.desired_state.as_str())
            .bind(ConnectorStatus::Assigning.as_str())
            .bind(new.kafka_id.as_deref())
            .bind(new.secret_ref.as_deref())
            .fetch_one(&self.pool)
            .await?;
        Ok(connector)
    }

    /// Get a connector by id. Soft-deleted rows are not found.
    pub async fn get(&self, id: &str) -> Result<Connector, ServiceError> {
        let query = format!(
            "SELECT {CONNECTOR_COLUMNS} FROM connectors WHERE id = $1 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, Connector>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("connector '{}' not found", id)))
    }

    /// List connectors with the given desired state, oldest first.
    pub async fn list_by_desired_state(
        &self,
        desired_state: ConnectorDesiredState,
    ) -> Result<Vec<Connector>, ServiceError> {
        let query = format!(
            "SELECT {CONNECTOR_COLUMNS} FROM connectors \
             WHERE desired_state = $1 AND deleted_at IS NULL \
             ORDER BY created_at ASC"
        );
        let rows = sqlx::query_as::<_, Connector>(&query)
            .bind(desired_state.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Persist only a phase change.
    pub async fn save_status(&self, id: &str, status: ConnectorStatus) -> Result<(), ServiceError> {
        let result = sqlx::query(
            "UPDATE connectors SET status = $2, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::not_found(format!(
                "connector '{}' not found",
                id
            )));
        }
        Ok(())
    }

    /// Mark a connector for deletion (the DELETE entry point).
    ///
    /// Idempotent: a connector whose desired state is already `deleted` is
    /// left untouched and the call succeeds.
    pub async fn register_deletion(&self, id: &str) -> Result<(), ServiceError> {
        let connector = self.get(id).await?;
        if connector.desired()? == ConnectorDesiredState::Deleted {
            return Ok(());
        }
        sqlx::query(
            "UPDATE connectors SET desired_state = $2, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(ConnectorDesiredState::Deleted.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Soft-delete a connector and return its secret reference.
    ///
    /// The vault secret is intentionally NOT deleted here: callers delete it
    /// only after this commit succeeds, so a failed write never orphans the
    /// record while the secret is already gone.
    pub async fn delete(&self, connector: &Connector) -> Result<Option<String>, ServiceError> {
        sqlx::query(
            "UPDATE connectors \
             SET status = $2, deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(&connector.id)
        .bind(ConnectorStatus::Deleted.as_str())
        .execute(&self.pool)
        .await?;
        Ok(connector.secret_ref.clone())
    }
}
