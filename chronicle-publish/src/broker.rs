//! Broker producer seam
//!
//! The broker product itself is an external collaborator; this trait
//! is the surface the publisher depends on. Implementations own their
//! bounded retry/backoff policy: an error returned from `produce`
//! means retries are exhausted.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Trait for broker producers.
#[async_trait]
pub trait BrokerProducer: Send + Sync {
    /// Deliver a payload to a topic. The partition key, when present,
    /// pins all payloads sharing it to one broker partition.
    async fn produce(
        &self,
        topic: &str,
        partition_key: Option<&str>,
        payload: &[u8],
    ) -> Result<(), BrokerError>;

    /// Block until buffered sends are acknowledged or the timeout
    /// elapses.
    async fn flush(&self, timeout: Duration) -> Result<(), BrokerError>;
}

/// Broker producer errors
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Failed to reach the broker
    #[error("connection failed: {0}")]
    Connection(String),

    /// Delivery failed after the producer's own retries
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// Operation timed out
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// Producer has been closed
    #[error("producer closed: {0}")]
    Closed(String),
}

impl BrokerError {
    /// Whether the caller could reasonably retry this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, BrokerError::Connection(_) | BrokerError::Timeout(_))
    }

    /// Short classification code, used in dead-letter records
    pub fn code(&self) -> &'static str {
        match self {
            BrokerError::Connection(_) => "connection",
            BrokerError::Delivery(_) => "delivery",
            BrokerError::Timeout(_) => "timeout",
            BrokerError::Closed(_) => "closed",
        }
    }
}

/// One delivery recorded by the in-memory producer
#[derive(Debug, Clone)]
pub struct ProducedMessage {
    /// Destination topic
    pub topic: String,

    /// Partition key, when one was selected
    pub partition_key: Option<String>,

    /// Raw payload bytes
    pub payload: Vec<u8>,
}

impl ProducedMessage {
    /// Deserialize the payload as JSON
    pub fn payload_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

/// In-memory producer (for testing/development)
#[derive(Clone, Default)]
pub struct InMemoryProducer {
    messages: Arc<RwLock<Vec<ProducedMessage>>>,
}

impl InMemoryProducer {
    /// Create an empty producer
    pub fn new() -> Self {
        Self {
            messages: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// All recorded deliveries
    pub async fn messages(&self) -> Vec<ProducedMessage> {
        self.messages.read().await.clone()
    }

    /// Recorded deliveries for one topic
    pub async fn on_topic(&self, topic: &str) -> Vec<ProducedMessage> {
        self.messages
            .read()
            .await
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    /// Drop all recorded deliveries
    pub async fn clear(&self) {
        self.messages.write().await.clear();
    }
}

#[async_trait]
impl BrokerProducer for InMemoryProducer {
    async fn produce(
        &self,
        topic: &str,
        partition_key: Option<&str>,
        payload: &[u8],
    ) -> Result<(), BrokerError> {
        self.messages.write().await.push(ProducedMessage {
            topic: topic.to_string(),
            partition_key: partition_key.map(|k| k.to_string()),
            payload: payload.to_vec(),
        });
        Ok(())
    }

    async fn flush(&self, _timeout: Duration) -> Result<(), BrokerError> {
        Ok(())
    }
}
