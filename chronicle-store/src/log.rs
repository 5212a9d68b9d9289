//! Shared in-memory record log
//!
//! Both store implementations keep their queryable state in this
//! structure; version assignment and query ordering live in exactly
//! one place. Callers must hold the store's write lock across
//! `prepare_append` and `commit` so the version check and the insert
//! form one atomic section.

use crate::record::{StreamRecord, StreamStats};
use crate::store::{ReadAllOptions, ReadStreamOptions, StoreError};
use chronicle_events::EventEnvelope;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Default)]
pub(crate) struct RecordLog {
    records: Vec<StreamRecord>,
    /// Indices into `records` per stream, in version order
    streams: HashMap<String, Vec<usize>>,
    last_position: u64,
}

impl RecordLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Max version in the stream, taken from the last committed
    /// record. Record count is not a safe proxy: the tolerant loader
    /// may have dropped a corrupt line, and an assigned version must
    /// never be reused.
    pub fn current_version(&self, stream_id: &str) -> u64 {
        self.streams
            .get(stream_id)
            .and_then(|indices| indices.last())
            .map(|&idx| self.records[idx].version)
            .unwrap_or(0)
    }

    pub fn stream_exists(&self, stream_id: &str) -> bool {
        self.streams.contains_key(stream_id)
    }

    /// Run the version check and build the records an append would
    /// insert. Mutates nothing; `commit` applies the result.
    pub fn prepare_append(
        &self,
        stream_id: &str,
        events: Vec<EventEnvelope>,
        expected_version: Option<u64>,
    ) -> Result<Vec<StreamRecord>, StoreError> {
        let current = self.current_version(stream_id);
        if let Some(expected) = expected_version {
            if expected != current {
                return Err(StoreError::ConcurrencyConflict {
                    stream_id: stream_id.to_string(),
                    expected,
                    actual: current,
                });
            }
        }

        let inserted_at = Utc::now();
        let mut prepared = Vec::with_capacity(events.len());
        for (offset, envelope) in events.into_iter().enumerate() {
            prepared.push(StreamRecord {
                stream_id: stream_id.to_string(),
                version: current + offset as u64 + 1,
                position: self.last_position + offset as u64 + 1,
                inserted_at,
                envelope,
            });
        }
        Ok(prepared)
    }

    /// Insert prepared records. Records must arrive in position order.
    pub fn commit(&mut self, records: Vec<StreamRecord>) {
        for record in records {
            let idx = self.records.len();
            self.last_position = record.position;
            self.streams
                .entry(record.stream_id.clone())
                .or_default()
                .push(idx);
            self.records.push(record);
        }
    }

    pub fn read_stream(&self, stream_id: &str, opts: &ReadStreamOptions) -> Vec<StreamRecord> {
        let Some(indices) = self.streams.get(stream_id) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for &idx in indices {
            let record = &self.records[idx];
            if record.version <= opts.from_version {
                continue;
            }
            if let Some(to) = opts.to_version {
                if record.version > to {
                    break;
                }
            }
            out.push(record.clone());
            if let Some(limit) = opts.limit {
                if out.len() >= limit {
                    break;
                }
            }
        }
        out
    }

    pub fn read_by_type(
        &self,
        event_type: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Vec<StreamRecord> {
        let mut out: Vec<StreamRecord> = self
            .records
            .iter()
            .filter(|r| r.envelope.event_type == event_type)
            .filter(|r| from.is_none_or(|from| r.envelope.occurred_at >= from))
            .filter(|r| to.is_none_or(|to| r.envelope.occurred_at <= to))
            .cloned()
            .collect();
        out.sort_by_key(|r| (r.envelope.occurred_at, r.position));
        if let Some(limit) = limit {
            out.truncate(limit);
        }
        out
    }

    pub fn read_by_correlation(&self, correlation_id: Uuid) -> Vec<StreamRecord> {
        let mut out: Vec<StreamRecord> = self
            .records
            .iter()
            .filter(|r| r.envelope.correlation_id == Some(correlation_id))
            .cloned()
            .collect();
        out.sort_by_key(|r| (r.envelope.occurred_at, r.position));
        out
    }

    pub fn read_all(&self, opts: &ReadAllOptions) -> Vec<StreamRecord> {
        let mut out = Vec::new();
        for record in &self.records {
            if record.position <= opts.after_position {
                continue;
            }
            if let Some(event_type) = &opts.event_type {
                if &record.envelope.event_type != event_type {
                    continue;
                }
            }
            if let Some(from) = opts.from {
                if record.envelope.occurred_at < from {
                    continue;
                }
            }
            if let Some(to) = opts.to {
                if record.envelope.occurred_at > to {
                    continue;
                }
            }
            out.push(record.clone());
            if let Some(limit) = opts.limit {
                if out.len() >= limit {
                    break;
                }
            }
        }
        out
    }

    pub fn stats(&self, stream_id: &str) -> StreamStats {
        let Some(indices) = self.streams.get(stream_id) else {
            return StreamStats::empty();
        };

        StreamStats {
            count: indices.len() as u64,
            current_version: indices
                .last()
                .map(|&idx| self.records[idx].version)
                .unwrap_or(0),
            first_event_at: indices
                .first()
                .map(|&idx| self.records[idx].envelope.occurred_at),
            last_event_at: indices
                .last()
                .map(|&idx| self.records[idx].envelope.occurred_at),
        }
    }
}
