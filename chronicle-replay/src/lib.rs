//! Replay engine for Chronicle
//!
//! Reconstructs state by streaming historical records through a
//! handler in bounded chunks. One corrupt or unresolvable record is
//! logged and skipped, never aborting the run; by default records are
//! re-dispatched through the exact same path live events take.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chronicle_replay::{ReplayEngine, ReplayOptions};
//!
//! let engine = ReplayEngine::new(store, registry, dispatcher);
//! let outcome = engine
//!     .replay(ReplayOptions::since(yesterday).event_type("orders.OrderCreated"))
//!     .await?;
//! println!("processed {}", outcome.processed);
//! ```

use async_trait::async_trait;
use chronicle_events::{EnvelopeDispatcher, EventEnvelope, EventTypeRegistry, HandlerError};
use chronicle_store::{
    EventStreamStore, ReadAllOptions, ReadStreamOptions, StoreError, StreamRecord,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

/// Replay configuration
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Records fetched per store read
    pub chunk_size: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self { chunk_size: 500 }
    }
}

/// What to replay
#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    /// Only records that occurred at or after this time
    pub from: Option<DateTime<Utc>>,

    /// Only records that occurred at or before this time
    pub to: Option<DateTime<Utc>>,

    /// Only records of this event type
    pub event_type: Option<String>,
}

impl ReplayOptions {
    /// Replay everything
    pub fn all() -> Self {
        Self::default()
    }

    /// Replay records occurring at or after this time
    pub fn since(from: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            ..Self::default()
        }
    }

    /// Upper occurrence-time bound (inclusive)
    pub fn until(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    /// Restrict to one event type
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }
}

/// Result of a replay run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayOutcome {
    /// Records handled successfully
    pub processed: u64,

    /// Records skipped because their type could not be resolved
    pub skipped: u64,

    /// Records whose handler failed
    pub failed: u64,
}

/// Handler invoked per replayed record
#[async_trait]
pub trait ReplayHandler: Send + Sync {
    /// Handle one record; the envelope is also passed rehydrated
    async fn handle(
        &self,
        envelope: &EventEnvelope,
        record: &StreamRecord,
    ) -> Result<(), HandlerError>;
}

/// Replays stored records through a handler or the live dispatch path
pub struct ReplayEngine {
    store: Arc<dyn EventStreamStore>,
    registry: Arc<EventTypeRegistry>,
    dispatcher: Arc<EnvelopeDispatcher>,
    config: ReplayConfig,
}

impl ReplayEngine {
    /// Create an engine with the default chunk size
    pub fn new(
        store: Arc<dyn EventStreamStore>,
        registry: Arc<EventTypeRegistry>,
        dispatcher: Arc<EnvelopeDispatcher>,
    ) -> Self {
        Self::with_config(store, registry, dispatcher, ReplayConfig::default())
    }

    /// Create an engine with custom configuration
    pub fn with_config(
        store: Arc<dyn EventStreamStore>,
        registry: Arc<EventTypeRegistry>,
        dispatcher: Arc<EnvelopeDispatcher>,
        config: ReplayConfig,
    ) -> Self {
        Self {
            store,
            registry,
            dispatcher,
            config,
        }
    }

    /// Replay matching records through the live dispatch path.
    ///
    /// Records are visited in global insertion order; across streams
    /// this can differ from `occurred_at` order when writers raced.
    /// Within one stream insertion order and version order agree.
    pub async fn replay(&self, opts: ReplayOptions) -> Result<ReplayOutcome, ReplayError> {
        self.run(opts, None).await
    }

    /// Replay matching records through an explicit handler, in the
    /// same insertion order as [`replay`](Self::replay)
    pub async fn replay_with(
        &self,
        opts: ReplayOptions,
        handler: Arc<dyn ReplayHandler>,
    ) -> Result<ReplayOutcome, ReplayError> {
        self.run(opts, Some(handler)).await
    }

    /// Replay one stream through a handler, starting after
    /// `from_version`. Pass 0 to rebuild from scratch, or a snapshot's
    /// version to replay only the tail; the two must produce identical
    /// results when the handler is seeded from that snapshot.
    pub async fn replay_stream(
        &self,
        stream_id: &str,
        from_version: u64,
        handler: Arc<dyn ReplayHandler>,
    ) -> Result<ReplayOutcome, ReplayError> {
        let mut outcome = ReplayOutcome::default();
        let mut cursor = from_version;

        loop {
            let chunk = self
                .store
                .read_stream(
                    stream_id,
                    ReadStreamOptions::all()
                        .from_version(cursor)
                        .limit(self.config.chunk_size),
                )
                .await?;
            if chunk.is_empty() {
                break;
            }

            for record in &chunk {
                cursor = record.version;
                self.process_record(record, Some(&handler), &mut outcome)
                    .await;
            }
        }

        info!(
            stream_id,
            processed = outcome.processed,
            skipped = outcome.skipped,
            failed = outcome.failed,
            "Stream replay complete"
        );
        Ok(outcome)
    }

    async fn run(
        &self,
        opts: ReplayOptions,
        handler: Option<Arc<dyn ReplayHandler>>,
    ) -> Result<ReplayOutcome, ReplayError> {
        let mut outcome = ReplayOutcome::default();
        let mut cursor = 0u64;

        loop {
            let chunk = self
                .store
                .read_all(ReadAllOptions {
                    after_position: cursor,
                    event_type: opts.event_type.clone(),
                    from: opts.from,
                    to: opts.to,
                    limit: Some(self.config.chunk_size),
                })
                .await?;
            if chunk.is_empty() {
                break;
            }

            for record in &chunk {
                cursor = record.position;
                self.process_record(record, handler.as_ref(), &mut outcome)
                    .await;
            }
        }

        info!(
            processed = outcome.processed,
            skipped = outcome.skipped,
            failed = outcome.failed,
            "Replay complete"
        );
        Ok(outcome)
    }

    async fn process_record(
        &self,
        record: &StreamRecord,
        handler: Option<&Arc<dyn ReplayHandler>>,
        outcome: &mut ReplayOutcome,
    ) {
        let envelope = &record.envelope;

        // Resolve the concrete type before handing the record on
        if let Err(e) = self.registry.decode(&envelope.event_type, &envelope.payload) {
            warn!(event_id = %envelope.id, "Skipping replay record: {}", e);
            outcome.skipped += 1;
            return;
        }

        let result = match handler {
            Some(handler) => handler
                .handle(envelope, record)
                .await
                .map_err(|e| e.to_string()),
            None => self
                .dispatcher
                .dispatch(envelope)
                .await
                .map_err(|e| e.to_string()),
        };

        match result {
            Ok(()) => outcome.processed += 1,
            Err(e) => {
                warn!(event_id = %envelope.id, "Replay handler failed: {}", e);
                outcome.failed += 1;
            }
        }
    }
}

/// Replay errors
///
/// Per-record failures are contained and counted; only store read
/// faults abort a run.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("store read failed: {0}")]
    Store(#[from] StoreError),
}
