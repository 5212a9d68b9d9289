//! Envelope dispatcher
//!
//! One dispatch path for live events and replayed records: handlers
//! subscribe by event-type string, and both the publisher side of the
//! application and the replay engine push envelopes through the same
//! `dispatch` call.

use crate::envelope::EventEnvelope;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Handler invoked for each dispatched envelope
#[async_trait]
pub trait EnvelopeHandler: Send + Sync {
    /// Handle the envelope
    async fn handle(&self, envelope: &EventEnvelope) -> Result<(), HandlerError>;
}

/// Handler error
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("handler failed: {0}")]
    Failed(String),

    #[error("event processing error: {0}")]
    Processing(String),
}

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Keep invoking remaining handlers after one fails
    pub continue_on_error: bool,

    /// Log dispatch activity
    pub enable_logging: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            continue_on_error: true,
            enable_logging: true,
        }
    }
}

/// Dispatches envelopes to handlers registered per event type
#[derive(Clone, Default)]
pub struct EnvelopeDispatcher {
    handlers: Arc<DashMap<String, Vec<Arc<dyn EnvelopeHandler>>>>,
    config: Arc<DispatcherConfig>,
}

impl EnvelopeDispatcher {
    /// Create a dispatcher with default configuration
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    /// Create a dispatcher with custom configuration
    pub fn with_config(config: DispatcherConfig) -> Self {
        Self {
            handlers: Arc::new(DashMap::new()),
            config: Arc::new(config),
        }
    }

    /// Subscribe a handler to an event type
    pub fn subscribe(&self, event_type: impl Into<String>, handler: Arc<dyn EnvelopeHandler>) {
        let event_type = event_type.into();
        if self.config.enable_logging {
            debug!(event_type = %event_type, "Subscribed envelope handler");
        }
        self.handlers.entry(event_type).or_default().push(handler);
    }

    /// Dispatch an envelope to all handlers for its event type.
    ///
    /// Handler failures are logged; whether remaining handlers still
    /// run is controlled by `continue_on_error`. Any failure surfaces
    /// in the returned error so callers can count it.
    pub async fn dispatch(&self, envelope: &EventEnvelope) -> Result<(), DispatchError> {
        let handlers = match self.handlers.get(envelope.event_type.as_str()) {
            Some(handlers) => handlers.clone(),
            None => {
                if self.config.enable_logging {
                    warn!(
                        event_type = %envelope.event_type,
                        event_id = %envelope.id,
                        "No handlers registered for event type"
                    );
                }
                return Ok(());
            }
        };

        let mut errors = Vec::new();
        for handler in handlers.iter() {
            if let Err(e) = handler.handle(envelope).await {
                error!(event_id = %envelope.id, "Handler failed: {}", e);
                errors.push(e);
                if !self.config.continue_on_error {
                    break;
                }
            }
        }

        if !errors.is_empty() {
            return Err(DispatchError::HandlersFailed(errors));
        }

        if self.config.enable_logging {
            debug!(
                event_type = %envelope.event_type,
                event_id = %envelope.id,
                "Envelope dispatched"
            );
        }
        Ok(())
    }

    /// Number of handlers registered for an event type
    pub fn handler_count(&self, event_type: &str) -> usize {
        self.handlers.get(event_type).map(|h| h.len()).unwrap_or(0)
    }

    /// Remove all handlers for an event type
    pub fn unsubscribe(&self, event_type: &str) {
        self.handlers.remove(event_type);
    }

    /// Remove all handlers
    pub fn clear(&self) {
        self.handlers.clear();
    }
}

/// Dispatch errors
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("one or more handlers failed")]
    HandlersFailed(Vec<HandlerError>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{DomainEvent, EventContext};
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicU32, Ordering};

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

    #[derive(Clone)]
    struct CountingHandler {
        counter: Arc<AtomicU32>,
    }

    impl CountingHandler {
        fn new() -> Self {
            Self {
                counter: Arc::new(AtomicU32::new(0)),
            }
        }

        fn count(&self) -> u32 {
            self.counter.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EnvelopeHandler for CountingHandler {
        async fn handle(&self, _envelope: &EventEnvelope) -> Result<(), HandlerError> {
            self.counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl EnvelopeHandler for FailingHandler {
        async fn handle(&self, _envelope: &EventEnvelope) -> Result<(), HandlerError> {
            Err(HandlerError::Failed("boom".to_string()))
        }
    }

    #[tokio::test]
    async fn test_dispatch_invokes_handlers() {
        let dispatcher = EnvelopeDispatcher::new();
        let handler = CountingHandler::new();
        dispatcher.subscribe("test.TestEvent", Arc::new(handler.clone()));

        let envelope = EventEnvelope::new(&TestEvent, &EventContext::new());
        dispatcher.dispatch(&envelope).await.unwrap();

        assert_eq!(handler.count(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_without_handlers_is_ok() {
        let dispatcher = EnvelopeDispatcher::new();
        let envelope = EventEnvelope::new(&TestEvent, &EventContext::new());
        assert!(dispatcher.dispatch(&envelope).await.is_ok());
    }

    #[tokio::test]
    async fn test_failure_still_runs_remaining_handlers() {
        let dispatcher = EnvelopeDispatcher::new();
        let handler = CountingHandler::new();
        dispatcher.subscribe("test.TestEvent", Arc::new(FailingHandler));
        dispatcher.subscribe("test.TestEvent", Arc::new(handler.clone()));

        let envelope = EventEnvelope::new(&TestEvent, &EventContext::new());
        let result = dispatcher.dispatch(&envelope).await;

        assert!(matches!(result, Err(DispatchError::HandlersFailed(_))));
        assert_eq!(handler.count(), 1);
    }

    #[tokio::test]
    async fn test_handler_count() {
        let dispatcher = EnvelopeDispatcher::new();
        assert_eq!(dispatcher.handler_count("test.TestEvent"), 0);

        dispatcher.subscribe("test.TestEvent", Arc::new(CountingHandler::new()));
        dispatcher.subscribe("test.TestEvent", Arc::new(CountingHandler::new()));
        assert_eq!(dispatcher.handler_count("test.TestEvent"), 2);

        dispatcher.unsubscribe("test.TestEvent");
        assert_eq!(dispatcher.handler_count("test.TestEvent"), 0);
    }
}
