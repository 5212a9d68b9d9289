//! Partition key selection
//!
//! The partition key is the mechanism that gives per-aggregate
//! ordering: the broker only guarantees order within one partition.
//! The policy is injectable since different aggregates may need
//! different ordering keys.

use chronicle_events::EventEnvelope;

/// Selects the broker partition key for an envelope
pub trait PartitionKeyPolicy: Send + Sync {
    /// Key for this envelope, or `None` for unkeyed delivery
    fn partition_key(&self, envelope: &EventEnvelope) -> Option<String>;
}

/// Default policy: `aggregate_id`, falling back to `correlation_id`,
/// else unkeyed.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateKeyPolicy;

impl PartitionKeyPolicy for AggregateKeyPolicy {
    fn partition_key(&self, envelope: &EventEnvelope) -> Option<String> {
        if let Some(aggregate_id) = &envelope.aggregate_id {
            return Some(aggregate_id.clone());
        }
        envelope.correlation_id.map(|id| id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_events::{DomainEvent, EventContext};
    use serde_json::{Value, json};
    use uuid::Uuid;

    struct TestEvent;

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &str {
            "test.TestEvent"
        }

        fn event_name(&self) -> &str {
            "TestEvent"
        }

        fn payload(&self) -> Value {
            json!({})
        }
    }

    #[test]
    fn test_aggregate_id_wins() {
        let envelope = EventEnvelope::new(&TestEvent, &EventContext::new())
            .with_aggregate("A", "Order");

        assert_eq!(
            AggregateKeyPolicy.partition_key(&envelope),
            Some("A".to_string())
        );
    }

    #[test]
    fn test_falls_back_to_correlation_id() {
        let correlation = Uuid::new_v4();
        let ctx = EventContext::new().with_correlation_id(correlation);
        let envelope = EventEnvelope::new(&TestEvent, &ctx);

        assert_eq!(
            AggregateKeyPolicy.partition_key(&envelope),
            Some(correlation.to_string())
        );
    }

    #[test]
    fn test_no_key_when_both_absent() {
        let ctx = EventContext::new();
        let mut envelope = EventEnvelope::new(&TestEvent, &ctx);
        envelope.correlation_id = None;

        assert_eq!(AggregateKeyPolicy.partition_key(&envelope), None);
    }

    #[test]
    fn test_same_aggregate_same_key() {
        let a = EventEnvelope::new(&TestEvent, &EventContext::new()).with_aggregate("A", "Order");
        let b = EventEnvelope::new(&TestEvent, &EventContext::new()).with_aggregate("A", "Order");

        assert_eq!(
            AggregateKeyPolicy.partition_key(&a),
            AggregateKeyPolicy.partition_key(&b)
        );
    }
}
