//! Snapshot store
//!
//! At most one live snapshot per stream, upserted last-write-wins.
//! Snapshots are a cost optimization only; replay from version 0 must
//! always produce identical results.

use crate::store::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cached aggregate state at a known stream version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Stream the snapshot belongs to
    pub stream_id: String,

    /// Aggregate type
    pub aggregate_type: String,

    /// Aggregate instance id
    pub aggregate_id: String,

    /// Stream version the state was materialized at
    pub version: u64,

    /// Serialized state
    pub state: Value,

    /// When the snapshot was created
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    /// Create a new snapshot
    pub fn new(
        stream_id: impl Into<String>,
        aggregate_type: impl Into<String>,
        aggregate_id: impl Into<String>,
        version: u64,
        state: Value,
    ) -> Self {
        Self {
            stream_id: stream_id.into(),
            aggregate_type: aggregate_type.into(),
            aggregate_id: aggregate_id.into(),
            version,
            state,
            created_at: Utc::now(),
        }
    }
}

/// Per-stream snapshot cache
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Upsert the snapshot for its stream, last-write-wins.
    ///
    /// Callers own the invariant that `snapshot.version` does not
    /// exceed the stream's current version; the snapshot store has no
    /// handle on the stream store and does not check it.
    async fn save(&self, snapshot: Snapshot) -> Result<(), StoreError>;

    /// Load the live snapshot for a stream, if any
    async fn load(&self, stream_id: &str) -> Result<Option<Snapshot>, StoreError>;
}

/// In-memory snapshot store
#[derive(Clone, Default)]
pub struct InMemorySnapshotStore {
    snapshots: DashMap<String, Snapshot>,
}

impl InMemorySnapshotStore {
    /// Create an empty snapshot store
    pub fn new() -> Self {
        Self {
            snapshots: DashMap::new(),
        }
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn save(&self, snapshot: Snapshot) -> Result<(), StoreError> {
        self.snapshots.insert(snapshot.stream_id.clone(), snapshot);
        Ok(())
    }

    async fn load(&self, stream_id: &str) -> Result<Option<Snapshot>, StoreError> {
        Ok(self.snapshots.get(stream_id).map(|s| s.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_and_load() {
        let store = InMemorySnapshotStore::new();

        let snapshot = Snapshot::new("order-1", "Order", "order-1", 10, json!({"total": 42}));
        store.save(snapshot).await.unwrap();

        let loaded = store.load("order-1").await.unwrap().unwrap();
        assert_eq!(loaded.version, 10);
        assert_eq!(loaded.state, json!({"total": 42}));
    }

    #[tokio::test]
    async fn test_upsert_is_last_write_wins() {
        let store = InMemorySnapshotStore::new();

        store
            .save(Snapshot::new("order-1", "Order", "order-1", 5, json!({"total": 1})))
            .await
            .unwrap();
        store
            .save(Snapshot::new("order-1", "Order", "order-1", 8, json!({"total": 2})))
            .await
            .unwrap();

        let loaded = store.load("order-1").await.unwrap().unwrap();
        assert_eq!(loaded.version, 8);
        assert_eq!(loaded.state, json!({"total": 2}));
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let store = InMemorySnapshotStore::new();
        assert!(store.load("missing").await.unwrap().is_none());
    }
}
