// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Connector catalog store operations.
//!
//! The catalog holds versioned descriptors of the connector types a
//! deployment supports. Shard metadata rows are keyed by
//! (type, channel, revision); within each (type, channel) group exactly one
//! row has `latest_revision IS NULL`, marking the current revision. All
//! multi-statement changes run in a single transaction so a concurrent
//! reader never sees two "current" rows for one group.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;

use armada_core::error::ServiceError;

use crate::catalog::ConnectorTypeDefinition;

/// A connector type catalog row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConnectorTypeRow {
    /// Type identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Type version label.
    pub version: String,
    /// Optional description.
    pub description: Option<String>,
    /// Checksum of the catalog entry this row was written from.
    pub checksum: Option<String>,
    /// True when the type left the catalog but is still used by connectors.
    pub deprecated: bool,
    /// When the type was first seen.
    pub created_at: DateTime<Utc>,
    /// When the type was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A shard metadata revision row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShardMetadataRow {
    /// Database primary key.
    pub id: i64,
    /// Owning connector type.
    pub connector_type_id: String,
    /// Distribution channel.
    pub channel: String,
    /// Revision number within the (type, channel) group.
    pub revision: i64,
    /// Points at the superseding revision; NULL marks the current one.
    pub latest_revision: Option<i64>,
    /// Shard metadata payload handed to the data plane.
    pub shard_metadata: serde_json::Value,
    /// When the revision was inserted.
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a shard metadata revision.
#[derive(Debug, Clone)]
pub struct ShardMetadataSpec {
    /// Owning connector type.
    pub connector_type_id: String,
    /// Distribution channel.
    pub channel: String,
    /// Revision number.
    pub revision: i64,
    /// Shard metadata payload.
    pub shard_metadata: serde_json::Value,
}

/// A connector type joined with the current shard metadata per channel.
#[derive(Debug, Clone)]
pub struct ConnectorCatalogEntry {
    /// The catalog type row.
    pub connector_type: ConnectorTypeRow,
    /// Current shard metadata per distribution channel.
    pub channels: HashMap<String, ShardMetadataRow>,
}

/// Explicit builder for [`ConnectorCatalogEntry`].
pub struct ConnectorCatalogEntryBuilder {
    connector_type: ConnectorTypeRow,
    channels: HashMap<String, ShardMetadataRow>,
}

impl ConnectorCatalogEntryBuilder {
    /// Start building an entry for the given type.
    pub fn new(connector_type: ConnectorTypeRow) -> Self {
        Self {
            connector_type,
            channels: HashMap::new(),
        }
    }

    /// Attach the current shard metadata for a channel.
    pub fn channel(mut self, name: impl Into<String>, metadata: ShardMetadataRow) -> Self {
        self.channels.insert(name.into(), metadata);
        self
    }

    /// Finish the entry.
    pub fn build(self) -> ConnectorCatalogEntry {
        ConnectorCatalogEntry {
            connector_type: self.connector_type,
            channels: self.channels,
        }
    }
}

const TYPE_COLUMNS: &str =
    "id, name, version, description, checksum, deprecated, created_at, updated_at";

const SHARD_COLUMNS: &str =
    "id, connector_type_id, channel, revision, latest_revision, shard_metadata, created_at";

/// Store service for the connector type catalog.
#[derive(Clone)]
pub struct ConnectorTypesService {
    pool: PgPool,
}

impl ConnectorTypesService {
    /// Create a new service over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a catalog type by id.
    pub async fn get(&self, id: &str) -> Result<ConnectorTypeRow, ServiceError> {
        let query = format!("SELECT {TYPE_COLUMNS} FROM connector_types WHERE id = $1");
        sqlx::query_as::<_, ConnectorTypeRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("connector type '{}' not found", id)))
    }

    /// Insert or update a catalog type and replace its channel associations.
    ///
    /// Re-appearing in the catalog clears a previous deprecation.
    pub async fn upsert_connector_type(
        &self,
        definition: &ConnectorTypeDefinition,
        channels: &[String],
    ) -> Result<(), ServiceError> {
        if definition.id.is_empty() {
            return Err(ServiceError::validation("connector type id is undefined"));
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO connector_types (id, name, version, description)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET name = $2, version = $3, description = $4,
                deprecated = FALSE, updated_at = NOW()
            "#,
        )
        .bind(&definition.id)
        .bind(&definition.name)
        .bind(&definition.version)
        .bind(definition.description.as_deref())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM connector_type_channels WHERE connector_type_id = $1")
            .bind(&definition.id)
            .execute(&mut *tx)
            .await?;

        for channel in channels {
            sqlx::query(
                "INSERT INTO connector_type_channels (connector_type_id, channel) VALUES ($1, $2)",
            )
            .bind(&definition.id)
            .bind(channel)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Stamp a type with the checksum of the catalog entry it was written from.
    pub async fn update_checksum(&self, id: &str, checksum: &str) -> Result<(), ServiceError> {
        let result = sqlx::query(
            "UPDATE connector_types SET checksum = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(checksum)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::not_found(format!(
                "connector type '{}' not found",
                id
            )));
        }
        Ok(())
    }

    /// Insert a shard metadata revision, maintaining the group invariant.
    ///
    /// If a row with the same (type, channel, revision) already exists its id
    /// is returned unchanged. Otherwise the group's current max revision
    /// decides the new row's `latest_revision`: inserting below the max marks
    /// the new row superseded; inserting a new max marks it current and
    /// repoints every smaller revision at it. The whole operation is one
    /// transaction, with the group's max row locked so concurrent puts
    /// serialize.
    pub async fn put_connector_shard_metadata(
        &self,
        spec: &ShardMetadataSpec,
    ) -> Result<i64, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM connector_shard_metadata \
             WHERE connector_type_id = $1 AND channel = $2 AND revision = $3",
        )
        .bind(&spec.connector_type_id)
        .bind(&spec.channel)
        .bind(spec.revision)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some((id,)) = existing {
            tx.commit().await?;
            return Ok(id);
        }

        let current_max: Option<i64> = sqlx::query_scalar(
            "SELECT revision FROM connector_shard_metadata \
             WHERE connector_type_id = $1 AND channel = $2 \
             ORDER BY revision DESC LIMIT 1 \
             FOR UPDATE",
        )
        .bind(&spec.connector_type_id)
        .bind(&spec.channel)
        .fetch_optional(&mut *tx)
        .await?;

        let latest_revision = match current_max {
            Some(max) if spec.revision < max => Some(max),
            _ => None,
        };

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO connector_shard_metadata
                (connector_type_id, channel, revision, latest_revision, shard_metadata)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&spec.connector_type_id)
        .bind(&spec.channel)
        .bind(spec.revision)
        .bind(latest_revision)
        .bind(&spec.shard_metadata)
        .fetch_one(&mut *tx)
        .await?;

        if latest_revision.is_none() {
            sqlx::query(
                "UPDATE connector_shard_metadata SET latest_revision = $3 \
                 WHERE connector_type_id = $1 AND channel = $2 AND revision < $3",
            )
            .bind(&spec.connector_type_id)
            .bind(&spec.channel)
            .bind(spec.revision)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    /// Get a specific shard metadata revision.
    pub async fn get_shard_metadata(
        &self,
        connector_type_id: &str,
        channel: &str,
        revision: i64,
    ) -> Result<ShardMetadataRow, ServiceError> {
        let query = format!(
            "SELECT {SHARD_COLUMNS} FROM connector_shard_metadata \
             WHERE connector_type_id = $1 AND channel = $2 AND revision = $3"
        );
        sqlx::query_as::<_, ShardMetadataRow>(&query)
            .bind(connector_type_id)
            .bind(channel)
            .bind(revision)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                ServiceError::not_found(format!(
                    "shard metadata (type '{}', channel '{}', revision {}) not found",
                    connector_type_id, channel, revision
                ))
            })
    }

    /// Get the highest shard metadata revision for a (type, channel) group.
    pub async fn get_latest_shard_metadata(
        &self,
        connector_type_id: &str,
        channel: &str,
    ) -> Result<ShardMetadataRow, ServiceError> {
        let query = format!(
            "SELECT {SHARD_COLUMNS} FROM connector_shard_metadata \
             WHERE connector_type_id = $1 AND channel = $2 \
             ORDER BY revision DESC LIMIT 1"
        );
        sqlx::query_as::<_, ShardMetadataRow>(&query)
            .bind(connector_type_id)
            .bind(channel)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                ServiceError::not_found(format!(
                    "shard metadata for connector type '{}' channel '{}' not found",
                    connector_type_id, channel
                ))
            })
    }

    /// Whether the persisted catalog matches the desired checksum map.
    ///
    /// True only if every desired type exists with a matching checksum and
    /// the counts line up.
    pub async fn catalog_entries_reconciled(
        &self,
        checksums: &HashMap<String, String>,
    ) -> Result<bool, ServiceError> {
        let ids: Vec<String> = checksums.keys().cloned().collect();
        let rows: Vec<(String, Option<String>)> =
            sqlx::query_as("SELECT id, checksum FROM connector_types WHERE id = ANY($1)")
                .bind(&ids)
                .fetch_all(&self.pool)
                .await?;

        if rows.len() != checksums.len() {
            return Ok(false);
        }
        for (id, checksum) in rows {
            if checksum.as_deref() != checksums.get(&id).map(String::as_str) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Remove or deprecate types that left the latest catalog.
    ///
    /// Types still referenced by a non-deleted connector are flagged
    /// deprecated, never deleted; unused removed types are hard-deleted
    /// along with their shard metadata. Referential safety: a type an
    /// existing connector depends on always survives.
    pub async fn delete_or_deprecate_removed_types(
        &self,
        catalog_ids: &[String],
    ) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;

        let used: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT connector_type_id FROM connectors WHERE deleted_at IS NULL",
        )
        .fetch_all(&mut *tx)
        .await?;

        let catalog: HashSet<&str> = catalog_ids.iter().map(String::as_str).collect();
        let deprecated: Vec<String> = used
            .iter()
            .filter(|id| !catalog.contains(id.as_str()))
            .cloned()
            .collect();

        if !deprecated.is_empty() {
            sqlx::query(
                "UPDATE connector_types SET deprecated = TRUE, updated_at = NOW() \
                 WHERE id = ANY($1)",
            )
            .bind(&deprecated)
            .execute(&mut *tx)
            .await?;
            debug!(types = ?deprecated, "deprecated in-use connector types removed from catalog");
        }

        let keep: Vec<String> = catalog_ids
            .iter()
            .chain(used.iter())
            .cloned()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let deleted_types = sqlx::query("DELETE FROM connector_types WHERE id <> ALL($1)")
            .bind(&keep)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM connector_shard_metadata WHERE connector_type_id <> ALL($1)")
            .bind(&keep)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        if deleted_types.rows_affected() > 0 {
            debug!(
                count = deleted_types.rows_affected(),
                "hard-deleted unused connector types removed from catalog"
            );
        }
        Ok(())
    }

    /// Channels associated with a catalog type.
    pub async fn list_channels(&self, connector_type_id: &str) -> Result<Vec<String>, ServiceError> {
        let channels: Vec<String> = sqlx::query_scalar(
            "SELECT channel FROM connector_type_channels \
             WHERE connector_type_id = $1 ORDER BY channel ASC",
        )
        .bind(connector_type_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(channels)
    }

    /// Build the catalog entry for a type: the type row plus the current
    /// shard metadata of each of its channels.
    pub async fn catalog_entry(
        &self,
        connector_type_id: &str,
    ) -> Result<ConnectorCatalogEntry, ServiceError> {
        let connector_type = self.get(connector_type_id).await?;
        let mut builder = ConnectorCatalogEntryBuilder::new(connector_type);
        for channel in self.list_channels(connector_type_id).await? {
            let metadata = self
                .get_latest_shard_metadata(connector_type_id, &channel)
                .await?;
            builder = builder.channel(channel, metadata);
        }
        Ok(builder.build())
    }
}
