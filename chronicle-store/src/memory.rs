//! In-memory stream store (for testing/development)

use crate::log::RecordLog;
use crate::record::{StreamRecord, StreamStats};
use crate::store::{EventStreamStore, ReadAllOptions, ReadStreamOptions, StoreError};
use async_trait::async_trait;
use chronicle_events::EventEnvelope;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// In-memory event stream store.
///
/// The write lock is the transactional boundary: the version check
/// and all inserts of one append happen under it, so two concurrent
/// appenders on the same stream can never both observe the same
/// current version. Reads run concurrently under the read lock.
#[derive(Clone, Default)]
pub struct InMemoryStreamStore {
    inner: Arc<RwLock<RecordLog>>,
}

impl InMemoryStreamStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(RecordLog::new())),
        }
    }
}

#[async_trait]
impl EventStreamStore for InMemoryStreamStore {
    async fn append(
        &self,
        stream_id: &str,
        events: Vec<EventEnvelope>,
        expected_version: Option<u64>,
    ) -> Result<(), StoreError> {
        if events.is_empty() && expected_version.is_none() {
            return Ok(());
        }

        let mut inner = self.inner.write().await;
        let records = inner.prepare_append(stream_id, events, expected_version)?;
        let appended = records.len();
        inner.commit(records);

        debug!(stream_id, appended, "Appended events to stream");
        Ok(())
    }

    async fn read_stream(
        &self,
        stream_id: &str,
        opts: ReadStreamOptions,
    ) -> Result<Vec<StreamRecord>, StoreError> {
        Ok(self.inner.read().await.read_stream(stream_id, &opts))
    }

    async fn read_by_type(
        &self,
        event_type: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Result<Vec<StreamRecord>, StoreError> {
        Ok(self.inner.read().await.read_by_type(event_type, from, to, limit))
    }

    async fn read_by_correlation_id(
        &self,
        correlation_id: Uuid,
    ) -> Result<Vec<StreamRecord>, StoreError> {
        Ok(self.inner.read().await.read_by_correlation(correlation_id))
    }

    async fn read_all(&self, opts: ReadAllOptions) -> Result<Vec<StreamRecord>, StoreError> {
        Ok(self.inner.read().await.read_all(&opts))
    }

    async fn current_version(&self, stream_id: &str) -> Result<u64, StoreError> {
        Ok(self.inner.read().await.current_version(stream_id))
    }

    async fn stream_exists(&self, stream_id: &str) -> Result<bool, StoreError> {
        Ok(self.inner.read().await.stream_exists(stream_id))
    }

    async fn stream_stats(&self, stream_id: &str) -> Result<StreamStats, StoreError> {
        Ok(self.inner.read().await.stats(stream_id))
    }
}
