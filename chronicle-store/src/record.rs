//! Stream records and stats

use chronicle_events::EventEnvelope;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One persisted event within a stream.
///
/// `(stream_id, version)` is unique; versions per stream are gapless
/// from 1. `position` is the store-assigned global insertion order
/// used by replay to cursor through history in bounded chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRecord {
    /// Stream this record belongs to
    pub stream_id: String,

    /// Version within the stream, assigned by the store
    #[serde(rename = "sequence_version")]
    pub version: u64,

    /// Global insertion position, assigned by the store
    pub position: u64,

    /// When the record was inserted
    pub inserted_at: DateTime<Utc>,

    /// The event, in its canonical wire shape
    pub envelope: EventEnvelope,
}

/// Per-stream statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStats {
    /// Number of records in the stream
    pub count: u64,

    /// Current max version (0 when the stream is absent)
    pub current_version: u64,

    /// Occurrence time of the first event
    pub first_event_at: Option<DateTime<Utc>>,

    /// Occurrence time of the last event
    pub last_event_at: Option<DateTime<Utc>>,
}

impl StreamStats {
    /// Stats for an absent stream
    pub fn empty() -> Self {
        Self {
            count: 0,
            current_version: 0,
            first_event_at: None,
            last_event_at: None,
        }
    }
}
