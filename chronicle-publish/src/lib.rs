//! Event publication for Chronicle
//!
//! Delivers envelopes to an external broker with at-least-once
//! semantics: partition keys pin per-aggregate ordering, exhausted
//! retries fall back to a dead-letter channel, and flush bounds
//! shutdown.
//!
//! ## Features
//!
//! - **BrokerProducer** - Seam for broker clients (`produce`/`flush`)
//! - **Partition keys** - Injectable policy, default aggregate-id chain
//! - **Dead-letter fallback** - No event is ever silently lost
//! - **Topic naming** - `{namespace}.{kebab-case(event_name)}` with override
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chronicle_publish::{EventPublisher, InMemoryProducer, PublisherConfig};
//! use std::sync::Arc;
//!
//! let broker = Arc::new(InMemoryProducer::new());
//! let publisher = EventPublisher::with_config(broker, PublisherConfig::new("orders"));
//! publisher.publish(&envelope).await?;
//! publisher.flush(std::time::Duration::from_secs(5)).await?;
//! ```

pub mod broker;
pub mod dead_letter;
pub mod partition;
pub mod publisher;

pub use broker::{BrokerError, BrokerProducer, InMemoryProducer, ProducedMessage};
pub use dead_letter::{DeadLetterCause, DeadLetterRecord};
pub use partition::{AggregateKeyPolicy, PartitionKeyPolicy};
pub use publisher::{EventPublisher, PublishError, PublisherConfig};
