// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Domain services over the persisted request store.
//!
//! Services are thin structs over a [`sqlx::PgPool`] exposing typed
//! operations with [`armada_core::ServiceError`] results. They are the only
//! code that mutates the store: reconcilers and the (external) API handlers
//! both go through them. Multi-statement changes run in a single
//! transaction so concurrent readers never observe partial writes.

mod admin;
mod connector_types;
mod connectors;
mod kafka;

pub use admin::{AdminKafkaService, KafkaAdminUpdate};
pub use connector_types::{
    ConnectorCatalogEntry, ConnectorCatalogEntryBuilder, ConnectorTypeRow, ConnectorTypesService,
    ShardMetadataRow, ShardMetadataSpec,
};
pub use connectors::{Connector, ConnectorsService, NewConnector};
pub use kafka::{KafkaRequest, KafkaService, NewKafkaRequest};
