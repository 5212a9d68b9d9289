// Chronicle - an event-sourcing core for Rust
//
// This library provides append-only event streams with optimistic
// concurrency, canonical wire envelopes, at-least-once broker
// publication with dead-letter fallback, and chunked replay for
// rebuilding state from history.

// Re-export envelope, registry, and dispatch primitives
pub use chronicle_events::*;

// Re-export stream storage and snapshots
pub use chronicle_store;

// Re-export broker publication
pub use chronicle_publish;

// Re-export the replay engine
pub use chronicle_replay;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        DomainEvent, EnvelopeDispatcher, EventContext, EventEnvelope, EventTypeRegistry,
    };
    pub use chronicle_publish::{
        AggregateKeyPolicy, BrokerProducer, EventPublisher, InMemoryProducer, PartitionKeyPolicy,
        PublisherConfig,
    };
    pub use chronicle_replay::{ReplayEngine, ReplayHandler, ReplayOptions, ReplayOutcome};
    pub use chronicle_store::{
        EventStreamStore, InMemoryStreamStore, ReadAllOptions, ReadStreamOptions, SnapshotStore,
        StoreError, StreamRecord,
    };
}
