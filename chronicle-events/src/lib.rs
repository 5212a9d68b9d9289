//! Event model for Chronicle
//!
//! This crate provides the event envelope value object, the explicit
//! construction context, the event-type registry, and the envelope
//! dispatcher shared by live consumers and replay.
//!
//! ## Features
//!
//! - **Envelope** - Immutable event record with tracing and versioning metadata
//! - **Wire format** - One canonical map for storage rows and broker payloads
//! - **Two factory paths** - `new` for fresh events, `hydrate` for persisted ones
//! - **Registry** - Event-type string to decode function, populated at startup
//! - **Dispatcher** - One dispatch path for live and replayed events
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chronicle_events::{DomainEvent, EventContext, EventEnvelope};
//! use serde_json::{json, Value};
//!
//! struct OrderCreated { total: i64 }
//!
//! impl DomainEvent for OrderCreated {
//!     fn event_type(&self) -> &str { "orders.OrderCreated" }
//!     fn event_name(&self) -> &str { "OrderCreated" }
//!     fn payload(&self) -> Value { json!({"total": self.total}) }
//! }
//!
//! let ctx = EventContext::new().with_actor("alice").with_origin("orders-svc");
//! let envelope = EventEnvelope::new(&OrderCreated { total: 100 }, &ctx)
//!     .with_aggregate("order-123", "Order");
//! let wire = envelope.to_wire()?;
//! ```

pub mod dispatch;
pub mod envelope;
pub mod registry;

pub use dispatch::{
    DispatchError, DispatcherConfig, EnvelopeDispatcher, EnvelopeHandler, HandlerError,
};
pub use envelope::{DomainEvent, EnvelopeError, EventContext, EventEnvelope};
pub use registry::{EventTypeRegistry, PayloadDecoder, RegisteredEvent, RegistryError};
