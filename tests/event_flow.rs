//! End-to-end flows across the whole workspace: raise, append,
//! publish, and rebuild through the facade crate.

use async_trait::async_trait;
use chronicle::prelude::*;
use chronicle::{HandlerError, RegisteredEvent};
use chronicle_replay::ReplayConfig;
use chronicle_store::{InMemorySnapshotStore, Snapshot};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use uuid::Uuid;

struct FundsDeposited {
    amount: i64,
}

impl DomainEvent for FundsDeposited {
    fn event_type(&self) -> &str {
        "accounts.FundsDeposited"
    }

    fn event_name(&self) -> &str {
        "FundsDeposited"
    }

    fn payload(&self) -> Value {
        json!({"amount": self.amount})
    }
}

#[derive(Debug, Deserialize)]
struct FundsDepositedPayload {
    #[allow(dead_code)]
    amount: i64,
}

impl RegisteredEvent for FundsDepositedPayload {
    fn registered_type() -> &'static str {
        "accounts.FundsDeposited"
    }
}

struct BalanceProjection {
    balance: AtomicI64,
}

impl BalanceProjection {
    fn new(seed: i64) -> Self {
        Self {
            balance: AtomicI64::new(seed),
        }
    }

    fn balance(&self) -> i64 {
        self.balance.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReplayHandler for BalanceProjection {
    async fn handle(
        &self,
        envelope: &EventEnvelope,
        _record: &StreamRecord,
    ) -> Result<(), HandlerError> {
        let amount = envelope.payload["amount"].as_i64().unwrap_or(0);
        self.balance.fetch_add(amount, Ordering::SeqCst);
        Ok(())
    }
}

fn registry() -> Arc<EventTypeRegistry> {
    let registry = EventTypeRegistry::new();
    registry.register::<FundsDepositedPayload>();
    Arc::new(registry)
}

async fn deposit(
    store: &InMemoryStreamStore,
    stream: &str,
    amount: i64,
    ctx: &EventContext,
) -> EventEnvelope {
    let envelope = EventEnvelope::new(&FundsDeposited { amount }, ctx)
        .with_aggregate(stream, "Account");
    let version = store.current_version(stream).await.unwrap();
    store
        .append(stream, vec![envelope.clone()], Some(version))
        .await
        .unwrap();
    envelope
}

#[tokio::test]
async fn append_publish_and_consume_share_one_wire_shape() {
    let store = InMemoryStreamStore::new();
    let producer = InMemoryProducer::new();
    let publisher = EventPublisher::with_config(
        Arc::new(producer.clone()),
        PublisherConfig::new("accounts"),
    );

    let ctx = EventContext::new().with_actor("teller-7").with_origin("branch-api");
    let envelope = deposit(&store, "account-42", 250, &ctx).await;
    publisher.publish(&envelope).await.unwrap();

    // Stored row and broker payload carry the same canonical map
    let records = store
        .read_stream("account-42", ReadStreamOptions::all())
        .await
        .unwrap();
    let stored = records[0].envelope.to_wire().unwrap();

    let delivered = producer.on_topic("accounts.funds-deposited").await;
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].partition_key.as_deref(), Some("account-42"));
    assert_eq!(delivered[0].payload_json().unwrap(), stored);
    assert_eq!(stored["metadata"]["actor"], json!("teller-7"));
    assert_eq!(stored["metadata"]["origin"], json!("branch-api"));
}

#[tokio::test]
async fn concurrent_writers_get_exactly_one_winner() {
    let store = Arc::new(InMemoryStreamStore::new());
    deposit(&store, "account-1", 100, &EventContext::new()).await;

    // Both writers read version 1, then race the append
    let a = {
        let store = store.clone();
        async move {
            let envelope = EventEnvelope::new(&FundsDeposited { amount: 10 }, &EventContext::new());
            store.append("account-1", vec![envelope], Some(1)).await
        }
    };
    let b = {
        let store = store.clone();
        async move {
            let envelope = EventEnvelope::new(&FundsDeposited { amount: 20 }, &EventContext::new());
            store.append("account-1", vec![envelope], Some(1)).await
        }
    };

    let (ra, rb) = tokio::join!(a, b);
    let conflicts = [&ra, &rb]
        .iter()
        .filter(|r| matches!(r, Err(StoreError::ConcurrencyConflict { .. })))
        .count();
    assert_eq!(conflicts, 1);
    assert_eq!(store.current_version("account-1").await.unwrap(), 2);
}

#[tokio::test]
async fn correlation_chain_links_a_transaction() {
    let store = InMemoryStreamStore::new();

    let root = deposit(&store, "account-1", 50, &EventContext::new()).await;
    let correlation = root.correlation_id.unwrap();

    // A downstream event raised in the same transaction context
    let follow_ctx = EventContext::new().with_correlation_id(correlation);
    let follow = EventEnvelope::new(&FundsDeposited { amount: 5 }, &follow_ctx)
        .with_aggregate("account-2", "Account")
        .caused_by(root.id);
    store.append("account-2", vec![follow], Some(0)).await.unwrap();

    let chain = store.read_by_correlation_id(correlation).await.unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0].envelope.id, root.id);
    assert_eq!(chain[1].envelope.causation_id, Some(root.id));

    // An unrelated event stays outside the chain
    deposit(&store, "account-3", 1, &EventContext::new()).await;
    assert_eq!(store.read_by_correlation_id(correlation).await.unwrap().len(), 2);
}

#[tokio::test]
async fn failed_publish_lands_in_dead_letter_with_original_event() {
    struct DownBroker {
        captured: InMemoryProducer,
    }

    #[async_trait]
    impl BrokerProducer for DownBroker {
        async fn produce(
            &self,
            topic: &str,
            partition_key: Option<&str>,
            payload: &[u8],
        ) -> Result<(), chronicle_publish::BrokerError> {
            if topic == "accounts.dead-letter" {
                return self.captured.produce(topic, partition_key, payload).await;
            }
            Err(chronicle_publish::BrokerError::Delivery(
                "all brokers down".to_string(),
            ))
        }

        async fn flush(
            &self,
            timeout: std::time::Duration,
        ) -> Result<(), chronicle_publish::BrokerError> {
            self.captured.flush(timeout).await
        }
    }

    let captured = InMemoryProducer::new();
    let publisher = EventPublisher::with_config(
        Arc::new(DownBroker {
            captured: captured.clone(),
        }),
        PublisherConfig::new("accounts").dead_letter_topic("accounts.dead-letter"),
    );

    let envelope = EventEnvelope::new(&FundsDeposited { amount: 9 }, &EventContext::new())
        .with_aggregate("account-9", "Account");
    let result = publisher.publish(&envelope).await;
    assert!(result.is_err());

    let dead = captured.on_topic("accounts.dead-letter").await;
    assert_eq!(dead.len(), 1);
    let record: chronicle_publish::DeadLetterRecord =
        serde_json::from_slice(&dead[0].payload).unwrap();
    assert_eq!(
        record.original_event["event_id"],
        json!(envelope.id.to_string())
    );
    assert_eq!(record.error.code, "delivery");
}

#[tokio::test]
async fn snapshot_is_an_optimization_not_a_requirement() {
    let store = Arc::new(InMemoryStreamStore::new());
    for amount in [100, 200, 50, 25] {
        deposit(&store, "account-1", amount, &EventContext::new()).await;
    }

    let snapshots = InMemorySnapshotStore::new();
    snapshots
        .save(Snapshot::new(
            "account-1",
            "Account",
            "account-1",
            2,
            json!({"balance": 300}),
        ))
        .await
        .unwrap();

    let engine = ReplayEngine::new(
        store.clone(),
        registry(),
        Arc::new(EnvelopeDispatcher::new()),
    );

    // Full rebuild ignoring the snapshot
    let full = Arc::new(BalanceProjection::new(0));
    engine.replay_stream("account-1", 0, full.clone()).await.unwrap();

    // Seeded rebuild replaying only the tail past the snapshot
    let snapshot = snapshots.load("account-1").await.unwrap().unwrap();
    let seeded = Arc::new(BalanceProjection::new(
        snapshot.state["balance"].as_i64().unwrap(),
    ));
    let tail = engine
        .replay_stream("account-1", snapshot.version, seeded.clone())
        .await
        .unwrap();

    assert_eq!(tail.processed, 2);
    assert_eq!(seeded.balance(), full.balance());
    assert_eq!(full.balance(), 375);
}

#[tokio::test]
async fn chunked_replay_isolates_bad_records() {
    struct GhostEvent;

    impl DomainEvent for GhostEvent {
        fn event_type(&self) -> &str {
            "accounts.Retired"
        }

        fn event_name(&self) -> &str {
            "Retired"
        }

        fn payload(&self) -> Value {
            json!({})
        }
    }

    let store = Arc::new(InMemoryStreamStore::new());
    for amount in 1..=7 {
        deposit(&store, "account-1", amount, &EventContext::new()).await;
    }
    // A record whose type no longer resolves
    let ghost = EventEnvelope::new(&GhostEvent, &EventContext::new());
    store.append("retired-1", vec![ghost], None).await.unwrap();

    let engine = ReplayEngine::with_config(
        store.clone(),
        registry(),
        Arc::new(EnvelopeDispatcher::new()),
        ReplayConfig { chunk_size: 3 },
    );

    let projection = Arc::new(BalanceProjection::new(0));
    let outcome = engine
        .replay_with(ReplayOptions::all(), projection.clone())
        .await
        .unwrap();

    assert_eq!(outcome.processed, 7);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.failed, 0);
    assert_eq!(projection.balance(), 28);
}

#[tokio::test]
async fn partition_key_falls_back_to_correlation_id() {
    let producer = InMemoryProducer::new();
    let publisher = EventPublisher::new(Arc::new(producer.clone()));

    let correlation = Uuid::new_v4();
    let ctx = EventContext::new().with_correlation_id(correlation);
    let envelope = EventEnvelope::new(&FundsDeposited { amount: 1 }, &ctx);
    publisher.publish(&envelope).await.unwrap();

    let delivered = producer.messages().await;
    assert_eq!(
        delivered[0].partition_key.as_deref(),
        Some(correlation.to_string().as_str())
    );
}
