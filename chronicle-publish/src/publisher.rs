//! Event publisher
//!
//! Delivers envelopes to the broker at-least-once. A publish that
//! fails after the producer's own retries dead-letters the original
//! wire envelope and re-raises the publish error; a failure to
//! dead-letter is the most severe failure class and is logged at
//! error level.

use crate::broker::{BrokerError, BrokerProducer};
use crate::dead_letter::DeadLetterRecord;
use crate::partition::{AggregateKeyPolicy, PartitionKeyPolicy};
use chronicle_events::EventEnvelope;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Publisher configuration
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Topic namespace prefix
    pub namespace: String,

    /// Dead-letter channel topic
    pub dead_letter_topic: String,

    /// Flush timeout used by `publish_batch` and shutdown flushes
    pub flush_timeout: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            namespace: "events".to_string(),
            dead_letter_topic: "events.dead-letter".to_string(),
            flush_timeout: Duration::from_secs(5),
        }
    }
}

impl PublisherConfig {
    /// Create config with the given namespace
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Set the dead-letter topic
    pub fn dead_letter_topic(mut self, topic: impl Into<String>) -> Self {
        self.dead_letter_topic = topic.into();
        self
    }

    /// Set the flush timeout
    pub fn flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }
}

/// Publishes envelopes to a broker with dead-letter fallback
pub struct EventPublisher {
    broker: Arc<dyn BrokerProducer>,
    key_policy: Arc<dyn PartitionKeyPolicy>,
    config: PublisherConfig,
}

impl EventPublisher {
    /// Create a publisher with default configuration and key policy
    pub fn new(broker: Arc<dyn BrokerProducer>) -> Self {
        Self::with_config(broker, PublisherConfig::default())
    }

    /// Create a publisher with custom configuration
    pub fn with_config(broker: Arc<dyn BrokerProducer>, config: PublisherConfig) -> Self {
        Self {
            broker,
            key_policy: Arc::new(AggregateKeyPolicy),
            config,
        }
    }

    /// Replace the partition key policy
    pub fn with_key_policy(mut self, policy: Arc<dyn PartitionKeyPolicy>) -> Self {
        self.key_policy = policy;
        self
    }

    /// Publisher configuration
    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Default topic for an envelope: `{namespace}.{kebab-case(name)}`
    pub fn topic_for(&self, envelope: &EventEnvelope) -> String {
        format!("{}.{}", self.config.namespace, kebab_case(&envelope.name))
    }

    /// Publish one envelope to its default topic
    pub async fn publish(&self, envelope: &EventEnvelope) -> Result<(), PublishError> {
        let topic = self.topic_for(envelope);
        self.publish_to(envelope, &topic).await
    }

    /// Publish one envelope to an explicit topic
    pub async fn publish_to(
        &self,
        envelope: &EventEnvelope,
        topic: &str,
    ) -> Result<(), PublishError> {
        let wire = envelope.to_wire().map_err(|e| PublishError::Serialization {
            event_id: envelope.id,
            reason: e.to_string(),
        })?;
        let payload = serde_json::to_vec(&wire).map_err(|e| PublishError::Serialization {
            event_id: envelope.id,
            reason: e.to_string(),
        })?;
        let key = self.key_policy.partition_key(envelope);

        debug!(event_id = %envelope.id, topic, key = key.as_deref(), "Publishing event");

        match self.broker.produce(topic, key.as_deref(), &payload).await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(
                    event_id = %envelope.id,
                    topic,
                    "Publish failed after broker retries: {}",
                    err
                );
                self.dead_letter(envelope.id, wire, &err).await;
                Err(PublishError::Transport {
                    event_id: envelope.id,
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Publish envelopes sequentially, then flush. The first publish
    /// error is surfaced after every envelope has been attempted.
    pub async fn publish_batch(&self, envelopes: &[EventEnvelope]) -> Result<(), PublishError> {
        let mut first_error = None;
        for envelope in envelopes {
            if let Err(err) = self.publish(envelope).await {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }

        let flush_result = self.flush(self.config.flush_timeout).await;
        match first_error {
            Some(err) => Err(err),
            None => flush_result,
        }
    }

    /// Flush buffered sends. A timeout here is a soft warning, not an
    /// error; callers use this before shutdown with a bounded wait.
    pub async fn flush(&self, timeout: Duration) -> Result<(), PublishError> {
        match self.broker.flush(timeout).await {
            Ok(()) => Ok(()),
            Err(BrokerError::Timeout(msg)) => {
                warn!("Flush timed out, unacknowledged sends may remain: {}", msg);
                Ok(())
            }
            Err(err) => Err(PublishError::Flush(err.to_string())),
        }
    }

    async fn dead_letter(&self, event_id: Uuid, original_event: Value, cause: &BrokerError) {
        let record = DeadLetterRecord::new(original_event, cause.to_string(), cause.code());
        let payload = match serde_json::to_vec(&record) {
            Ok(payload) => payload,
            Err(e) => {
                error!(
                    event_id = %event_id,
                    "Dead-letter record serialization failed, event may be lost: {}",
                    e
                );
                return;
            }
        };

        match self
            .broker
            .produce(&self.config.dead_letter_topic, None, &payload)
            .await
        {
            Ok(()) => {
                warn!(
                    event_id = %event_id,
                    topic = %self.config.dead_letter_topic,
                    "Event dead-lettered"
                );
            }
            Err(dl_err) => {
                error!(
                    event_id = %event_id,
                    topic = %self.config.dead_letter_topic,
                    "Dead-letter capture failed, event may be lost: {}",
                    dl_err
                );
            }
        }
    }
}

/// Publisher errors
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Transport fault after the producer's retries were exhausted;
    /// the event has been dead-lettered
    #[error("publish failed for event {event_id}: {reason}")]
    Transport { event_id: Uuid, reason: String },

    #[error("serialization failed for event {event_id}: {reason}")]
    Serialization { event_id: Uuid, reason: String },

    #[error("flush failed: {0}")]
    Flush(String),
}

fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch == '_' || ch == ' ' || ch == '.' {
            out.push('-');
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() {
            if prev_lower {
                out.push('-');
            }
            out.extend(ch.to_lowercase());
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}
