//! Schema Snapshot Store
//!
//! Keeps the latest analysed snapshot of every connection so a refresh can
//! run without the caller resending it. Versions count up per connection.

use crate::analyser::SchemaSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A snapshot together with where and when it was taken
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSnapshot {
    pub connection_id: Uuid,
    pub version: u64,
    pub captured_at: DateTime<Utc>,
    pub snapshot: SchemaSnapshot,
}

/// Metadata about a stored snapshot (lightweight, used for listing)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub connection_id: Uuid,
    pub version: u64,
    pub captured_at: DateTime<Utc>,
    pub table_count: usize,
    pub object_count: usize,
}

impl From<&StoredSnapshot> for SnapshotMetadata {
    fn from(stored: &StoredSnapshot) -> Self {
        Self {
            connection_id: stored.connection_id,
            version: stored.version,
            captured_at: stored.captured_at,
            table_count: stored.snapshot.tables.len(),
            object_count: stored.snapshot.object_count(),
        }
    }
}

/// Latest snapshot per connection
pub struct SnapshotStore {
    latest: RwLock<HashMap<Uuid, StoredSnapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            latest: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the latest snapshot of a connection, bumping its version
    pub async fn save(&self, connection_id: Uuid, snapshot: SchemaSnapshot) -> StoredSnapshot {
        let mut latest = self.latest.write().await;
        let version = latest.get(&connection_id).map_or(0, |s| s.version) + 1;

        let stored = StoredSnapshot {
            connection_id,
            version,
            captured_at: Utc::now(),
            snapshot,
        };
        latest.insert(connection_id, stored.clone());

        tracing::info!(
            "Saved snapshot v{} for connection {}: {} objects",
            version,
            connection_id,
            stored.snapshot.object_count()
        );

        stored
    }

    /// Get the latest snapshot for a connection
    pub async fn get_latest(&self, connection_id: Uuid) -> Option<StoredSnapshot> {
        self.latest.read().await.get(&connection_id).cloned()
    }

    /// Drop everything kept for a connection
    pub async fn remove(&self, connection_id: Uuid) -> bool {
        self.latest.write().await.remove(&connection_id).is_some()
    }

    /// Metadata of every connection's latest snapshot, newest first
    pub async fn list(&self) -> Vec<SnapshotMetadata> {
        let mut list: Vec<_> = self
            .latest
            .read()
            .await
            .values()
            .map(SnapshotMetadata::from)
            .collect();
        list.sort_by(|a, b| b.captured_at.cmp(&a.captured_at));
        list
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
