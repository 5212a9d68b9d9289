//! Event envelope and construction context

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Domain event trait
///
/// Concrete event types implement this to describe themselves and
/// produce their payload. The envelope carries everything else.
pub trait DomainEvent: Send + Sync {
    /// Fully-qualified event type name
    fn event_type(&self) -> &str;

    /// Short event type label
    fn event_name(&self) -> &str;

    /// Payload schema version, for evolution
    fn schema_version(&self) -> u32 {
        1
    }

    /// Produce the event payload
    fn payload(&self) -> Value;
}

/// Context passed into envelope construction
///
/// Carries the acting principal, the origin service, an inherited
/// correlation id, and any extra metadata entries. There is no ambient
/// per-request state; callers hand this in explicitly.
#[derive(Debug, Clone, Default)]
pub struct EventContext {
    /// Acting principal, recorded into envelope metadata
    pub actor: Option<String>,

    /// Originating service or component
    pub origin: Option<String>,

    /// Correlation id inherited from a broader request context
    pub correlation_id: Option<Uuid>,

    /// Extra metadata merged into every envelope built with this context
    pub metadata: Map<String, Value>,
}

impl EventContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the acting principal
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Set the origin service
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Inherit a correlation id instead of generating a fresh one
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Immutable record of one domain event plus tracing and versioning
/// metadata.
///
/// The serde representation of this struct is the canonical wire
/// shape, used identically for storage rows and broker payloads, so
/// the stored and published forms cannot drift apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Globally unique event id
    #[serde(rename = "event_id")]
    pub id: Uuid,

    /// Fully-qualified event type name
    pub event_type: String,

    /// Short event type label
    #[serde(rename = "event_name")]
    pub name: String,

    /// Payload schema version
    #[serde(rename = "version")]
    pub schema_version: u32,

    /// When the event occurred
    pub occurred_at: DateTime<Utc>,

    /// Correlation id shared across one end-to-end transaction
    pub correlation_id: Option<Uuid>,

    /// Id of the event that caused this one
    pub causation_id: Option<Uuid>,

    /// Aggregate instance id
    pub aggregate_id: Option<String>,

    /// Aggregate type
    pub aggregate_type: Option<String>,

    /// Opaque event payload
    pub payload: Value,

    /// Custom metadata
    pub metadata: Map<String, Value>,
}

impl EventEnvelope {
    /// Construct a new envelope for a freshly raised event.
    ///
    /// Assigns a fresh id and timestamp. The correlation id is
    /// inherited from the context when present, otherwise generated.
    /// Context metadata (actor, origin, extras) is merged in.
    pub fn new(event: &dyn DomainEvent, ctx: &EventContext) -> Self {
        let mut metadata = ctx.metadata.clone();
        if let Some(actor) = &ctx.actor {
            metadata.insert("actor".to_string(), Value::String(actor.clone()));
        }
        if let Some(origin) = &ctx.origin {
            metadata.insert("origin".to_string(), Value::String(origin.clone()));
        }

        Self {
            id: Uuid::new_v4(),
            event_type: event.event_type().to_string(),
            name: event.event_name().to_string(),
            schema_version: event.schema_version(),
            occurred_at: Utc::now(),
            correlation_id: Some(ctx.correlation_id.unwrap_or_else(Uuid::new_v4)),
            causation_id: None,
            aggregate_id: None,
            aggregate_type: None,
            payload: event.payload(),
            metadata,
        }
    }

    /// Attach the aggregate this event belongs to
    pub fn with_aggregate(
        mut self,
        aggregate_id: impl Into<String>,
        aggregate_type: impl Into<String>,
    ) -> Self {
        self.aggregate_id = Some(aggregate_id.into());
        self.aggregate_type = Some(aggregate_type.into());
        self
    }

    /// Record the event that caused this one
    pub fn caused_by(mut self, event_id: Uuid) -> Self {
        self.causation_id = Some(event_id);
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Produce the canonical wire map.
    ///
    /// The same map is used for persistence and publication.
    pub fn to_wire(&self) -> Result<Value, EnvelopeError> {
        serde_json::to_value(self).map_err(|e| EnvelopeError::Serialization(e.to_string()))
    }

    /// Reconstruct an envelope from a persisted wire map.
    ///
    /// Persisted id, timestamp, and version are accepted as-is; nothing
    /// is regenerated. This is the factory path used for replay.
    pub fn hydrate(wire: Value) -> Result<Self, EnvelopeError> {
        serde_json::from_value(wire).map_err(|e| EnvelopeError::Deserialization(e.to_string()))
    }
}

/// Envelope serialization errors
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("envelope serialization failed: {0}")]
    Serialization(String),

    #[error("envelope deserialization failed: {0}")]
    Deserialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct TestEvent {
        amount: i64,
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &str {
            "orders.OrderCreated"
        }

        fn event_name(&self) -> &str {
            "OrderCreated"
        }

        fn payload(&self) -> Value {
            json!({"amount": self.amount})
        }
    }

    #[test]
    fn test_new_envelope_generates_id_and_correlation() {
        let ctx = EventContext::new().with_actor("alice").with_origin("orders-svc");
        let envelope = EventEnvelope::new(&TestEvent { amount: 5 }, &ctx);

        assert_eq!(envelope.event_type, "orders.OrderCreated");
        assert_eq!(envelope.name, "OrderCreated");
        assert_eq!(envelope.schema_version, 1);
        assert!(envelope.correlation_id.is_some());
        assert_eq!(envelope.metadata.get("actor"), Some(&json!("alice")));
        assert_eq!(envelope.metadata.get("origin"), Some(&json!("orders-svc")));
    }

    #[test]
    fn test_inherited_correlation_id() {
        let correlation = Uuid::new_v4();
        let ctx = EventContext::new().with_correlation_id(correlation);

        let envelope = EventEnvelope::new(&TestEvent { amount: 1 }, &ctx);
        assert_eq!(envelope.correlation_id, Some(correlation));
    }

    #[test]
    fn test_builder_refinements() {
        let cause = Uuid::new_v4();
        let envelope = EventEnvelope::new(&TestEvent { amount: 1 }, &EventContext::new())
            .with_aggregate("order-123", "Order")
            .caused_by(cause)
            .with_metadata("tenant", json!("acme"));

        assert_eq!(envelope.aggregate_id.as_deref(), Some("order-123"));
        assert_eq!(envelope.aggregate_type.as_deref(), Some("Order"));
        assert_eq!(envelope.causation_id, Some(cause));
        assert_eq!(envelope.metadata.get("tenant"), Some(&json!("acme")));
    }

    #[test]
    fn test_wire_shape_keys() {
        let envelope = EventEnvelope::new(&TestEvent { amount: 2 }, &EventContext::new());
        let wire = envelope.to_wire().unwrap();

        assert!(wire.get("event_id").is_some());
        assert_eq!(wire["event_type"], json!("orders.OrderCreated"));
        assert_eq!(wire["event_name"], json!("OrderCreated"));
        assert_eq!(wire["version"], json!(1));
        assert!(wire.get("occurred_at").is_some());
        assert_eq!(wire["payload"], json!({"amount": 2}));
    }

    #[test]
    fn test_hydrate_preserves_persisted_fields() {
        let envelope = EventEnvelope::new(&TestEvent { amount: 3 }, &EventContext::new())
            .with_aggregate("order-9", "Order");
        let wire = envelope.to_wire().unwrap();

        let hydrated = EventEnvelope::hydrate(wire).unwrap();
        assert_eq!(hydrated.id, envelope.id);
        assert_eq!(hydrated.occurred_at, envelope.occurred_at);
        assert_eq!(hydrated.correlation_id, envelope.correlation_id);
        assert_eq!(hydrated.aggregate_id, envelope.aggregate_id);
        assert_eq!(hydrated.payload, envelope.payload);
    }

    #[test]
    fn test_hydrate_rejects_malformed_wire() {
        let result = EventEnvelope::hydrate(json!({"event_id": "not-a-uuid"}));
        assert!(matches!(result, Err(EnvelopeError::Deserialization(_))));
    }
}
