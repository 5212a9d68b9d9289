//! Stream store trait and errors

use crate::record::{StreamRecord, StreamStats};
use async_trait::async_trait;
use chronicle_events::EventEnvelope;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Options for reading one stream
#[derive(Debug, Clone, Default)]
pub struct ReadStreamOptions {
    /// Return versions strictly greater than this
    pub from_version: u64,

    /// Return versions up to and including this
    pub to_version: Option<u64>,

    /// Maximum number of records to return
    pub limit: Option<usize>,
}

impl ReadStreamOptions {
    /// Read the whole stream
    pub fn all() -> Self {
        Self::default()
    }

    /// Start after this version
    pub fn from_version(mut self, version: u64) -> Self {
        self.from_version = version;
        self
    }

    /// Stop at this version (inclusive)
    pub fn to_version(mut self, version: u64) -> Self {
        self.to_version = Some(version);
        self
    }

    /// Cap the number of records, for chunked reads
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Options for reading the global log in insertion order
#[derive(Debug, Clone, Default)]
pub struct ReadAllOptions {
    /// Return records with a position strictly greater than this
    pub after_position: u64,

    /// Only records of this event type
    pub event_type: Option<String>,

    /// Only records that occurred at or after this time
    pub from: Option<DateTime<Utc>>,

    /// Only records that occurred at or before this time
    pub to: Option<DateTime<Utc>>,

    /// Maximum number of records to return
    pub limit: Option<usize>,
}

impl ReadAllOptions {
    /// Read everything from the start
    pub fn from_start() -> Self {
        Self::default()
    }

    /// Resume after this position
    pub fn after_position(mut self, position: u64) -> Self {
        self.after_position = position;
        self
    }

    /// Filter by event type
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Lower occurrence-time bound (inclusive)
    pub fn from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    /// Upper occurrence-time bound (inclusive)
    pub fn to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    /// Cap the number of records
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Durable per-stream append log with optimistic concurrency.
///
/// Implement this trait to provide custom storage (e.g. PostgreSQL,
/// EventStoreDB). The store exclusively owns version assignment;
/// callers never choose version numbers.
#[async_trait]
pub trait EventStreamStore: Send + Sync {
    /// Append events to a stream in one transaction.
    ///
    /// When `expected_version` is supplied it is compared atomically
    /// against the stream's current max version; on mismatch nothing
    /// is mutated and `StoreError::ConcurrencyConflict` is returned.
    /// Events receive versions `current+1 ..= current+N`; partial
    /// appends never happen. An empty event list with no expected
    /// version is a no-op.
    async fn append(
        &self,
        stream_id: &str,
        events: Vec<EventEnvelope>,
        expected_version: Option<u64>,
    ) -> Result<(), StoreError>;

    /// Read one stream in ascending version order
    async fn read_stream(
        &self,
        stream_id: &str,
        opts: ReadStreamOptions,
    ) -> Result<Vec<StreamRecord>, StoreError>;

    /// Read records of one event type across all streams, ordered by
    /// occurrence time
    async fn read_by_type(
        &self,
        event_type: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Result<Vec<StreamRecord>, StoreError>;

    /// Read records sharing a correlation id across all streams,
    /// ordered by occurrence time
    async fn read_by_correlation_id(
        &self,
        correlation_id: Uuid,
    ) -> Result<Vec<StreamRecord>, StoreError>;

    /// Read the global log in insertion order, for chunked replay
    async fn read_all(&self, opts: ReadAllOptions) -> Result<Vec<StreamRecord>, StoreError>;

    /// Current max version of a stream, 0 when absent
    async fn current_version(&self, stream_id: &str) -> Result<u64, StoreError>;

    /// Whether the stream has any records
    async fn stream_exists(&self, stream_id: &str) -> Result<bool, StoreError>;

    /// Per-stream statistics
    async fn stream_stats(&self, stream_id: &str) -> Result<StreamStats, StoreError>;
}

/// Stream store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Expected-version mismatch on append; the caller must re-read
    /// state and retry the business operation
    #[error(
        "concurrency conflict on stream {stream_id}: expected version {expected}, actual {actual}"
    )]
    ConcurrencyConflict {
        stream_id: String,
        expected: u64,
        actual: u64,
    },

    /// Storage fault during append; the whole batch was rolled back
    #[error("append failed: {0}")]
    AppendFailed(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
