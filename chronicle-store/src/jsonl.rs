//! Durable JSONL-backed stream store
//!
//! Records are appended to a single `events.jsonl` under the data
//! directory, one JSON object per line, fsynced per append. The whole
//! log is loaded at open to rebuild the in-memory index; lines that
//! fail to parse are logged and skipped so one corrupt record never
//! blocks opening the store.

use crate::log::RecordLog;
use crate::record::{StreamRecord, StreamStats};
use crate::store::{EventStreamStore, ReadAllOptions, ReadStreamOptions, StoreError};
use async_trait::async_trait;
use chronicle_events::EventEnvelope;
use chrono::{DateTime, Utc};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Configuration for the JSONL store
#[derive(Debug, Clone)]
pub struct JsonlStoreConfig {
    /// Path to the data directory
    pub data_dir: PathBuf,
}

impl JsonlStoreConfig {
    /// Create config with the given data directory
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    /// Path to events.jsonl
    pub fn events_path(&self) -> PathBuf {
        self.data_dir.join("events.jsonl")
    }
}

/// Durable stream store over an append-only JSONL file.
///
/// The write lock covers the version check, the file write, and the
/// index update, giving the same transactional boundary as the
/// in-memory store. A batch is serialized into one buffer and written
/// with a single write + fsync, so appends are all-or-nothing on the
/// happy path and a torn trailing line is dropped by the tolerant
/// loader on the next open.
pub struct JsonlStreamStore {
    config: JsonlStoreConfig,
    inner: Arc<RwLock<RecordLog>>,
}

impl JsonlStreamStore {
    /// Open the store, creating the data directory if needed and
    /// rebuilding the index from any existing log.
    pub async fn open(config: JsonlStoreConfig) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&config.data_dir)?;

        let mut log = RecordLog::new();
        let events_path = config.events_path();
        if events_path.exists() {
            let file = File::open(&events_path)?;
            let reader = BufReader::new(file);
            let mut loaded = 0u64;

            for (line_num, line_result) in reader.lines().enumerate() {
                let line = line_result?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<StreamRecord>(&line) {
                    Ok(record) => {
                        log.commit(vec![record]);
                        loaded += 1;
                    }
                    Err(e) => {
                        warn!(line = line_num + 1, "Skipping unparsable event record: {}", e);
                    }
                }
            }
            info!(loaded, path = %events_path.display(), "Loaded event log");
        }

        Ok(Self {
            config,
            inner: Arc::new(RwLock::new(log)),
        })
    }

    /// Store configuration
    pub fn config(&self) -> &JsonlStoreConfig {
        &self.config
    }

    fn write_records(&self, records: &[StreamRecord]) -> Result<(), StoreError> {
        let mut buf = String::new();
        for record in records {
            let line = serde_json::to_string(record)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            buf.push_str(&line);
            buf.push('\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.config.events_path())?;
        file.write_all(buf.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }
}

#[async_trait]
impl EventStreamStore for JsonlStreamStore {
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
        if !records.is_empty() {
            self.write_records(&records)?;
            let appended = records.len();
            inner.commit(records);
            debug!(stream_id, appended, "Appended events to log");
        }
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
