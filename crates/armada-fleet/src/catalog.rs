// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Connector catalog file model.
//!
//! The desired catalog is a directory of JSON files, one entry per
//! connector type, each listing the shard metadata revision per
//! distribution channel. Entries are checksummed at load time; the catalog
//! reconciler compares those checksums with the store to decide whether an
//! upsert pass is needed.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use armada_core::error::ServiceError;

/// Descriptor of a connector type as declared in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorTypeDefinition {
    /// Type identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Type version label.
    pub version: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Per-channel shard metadata declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelDefinition {
    /// Shard metadata revision number.
    pub revision: i64,
    /// Shard metadata payload handed to the data plane.
    pub shard_metadata: serde_json::Value,
}

/// One catalog entry: a connector type and its channels.
///
/// Channels are a sorted map so an entry always serializes the same way
/// and its checksum is stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// The connector type.
    pub connector_type: ConnectorTypeDefinition,
    /// Channel name to shard metadata declaration.
    pub channels: BTreeMap<String, ChannelDefinition>,
}

impl CatalogEntry {
    /// Checksum over the entry's canonical JSON serialization.
    pub fn checksum(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }
}

/// The desired connector catalog: entries plus their checksums.
#[derive(Debug, Clone, Default)]
pub struct ConnectorCatalog {
    entries: Vec<CatalogEntry>,
    checksums: HashMap<String, String>,
}

impl ConnectorCatalog {
    /// Build a catalog from entries, computing checksums.
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        let checksums = entries
            .iter()
            .map(|entry| (entry.connector_type.id.clone(), entry.checksum()))
            .collect();
        Self { entries, checksums }
    }

    /// Load every `*.json` entry file from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Self, ServiceError> {
        let mut entries = Vec::new();
        let mut paths: Vec<_> = std::fs::read_dir(dir)
            .map_err(|e| {
                ServiceError::general(format!(
                    "failed to read catalog directory {}: {}",
                    dir.display(),
                    e
                ))
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        for path in paths {
            let content = std::fs::read_to_string(&path).map_err(|e| {
                ServiceError::general(format!(
                    "failed to read catalog entry {}: {}",
                    path.display(),
                    e
                ))
            })?;
            let entry: CatalogEntry = serde_json::from_str(&content).map_err(|e| {
                ServiceError::general(format!(
                    "failed to parse catalog entry {}: {}",
                    path.display(),
                    e
                ))
            })?;
            entries.push(entry);
        }

        Ok(Self::new(entries))
    }

    /// The catalog entries.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Checksum per connector type id.
    pub fn checksums(&self) -> &HashMap<String, String> {
        &self.checksums
    }

    /// Ids of every type in the catalog.
    pub fn type_ids(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.connector_type.id.clone())
            .collect()
    }

    /// True when the catalog has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
