//! Event type registry
//!
//! Maps a stored event-type string to a decode function. Each
//! event-defining module registers its types at startup; the replay
//! engine consults the registry to resolve a concrete type before a
//! record is processed. Unknown types are an error the caller can
//! skip on, never a panic.

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use tracing::debug;

/// Decode function turning a stored payload into a concrete event
pub type PayloadDecoder =
    Arc<dyn Fn(&Value) -> Result<Box<dyn Any + Send>, RegistryError> + Send + Sync>;

/// Events that can be registered for decoding by type name
pub trait RegisteredEvent: DeserializeOwned + Send + 'static {
    /// The fully-qualified type name stored in envelopes
    fn registered_type() -> &'static str;
}

/// Registry of event-type decoders
#[derive(Default)]
pub struct EventTypeRegistry {
    decoders: DashMap<String, PayloadDecoder>,
}

impl EventTypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            decoders: DashMap::new(),
        }
    }

    /// Register a decodable event type
    pub fn register<E: RegisteredEvent>(&self) {
        let decoder: PayloadDecoder = Arc::new(|payload: &Value| {
            let event: E = serde_json::from_value(payload.clone())
                .map_err(|e| RegistryError::DecodeFailed(e.to_string()))?;
            Ok(Box::new(event) as Box<dyn Any + Send>)
        });
        self.decoders
            .insert(E::registered_type().to_string(), decoder);
        debug!(event_type = E::registered_type(), "Registered event decoder");
    }

    /// Register a custom decode function for an event type
    pub fn register_decoder(&self, event_type: impl Into<String>, decoder: PayloadDecoder) {
        let event_type = event_type.into();
        debug!(event_type = %event_type, "Registered event decoder");
        self.decoders.insert(event_type, decoder);
    }

    /// Whether a decoder exists for this event type
    pub fn resolves(&self, event_type: &str) -> bool {
        self.decoders.contains_key(event_type)
    }

    /// Decode a stored payload for the given event type
    pub fn decode(
        &self,
        event_type: &str,
        payload: &Value,
    ) -> Result<Box<dyn Any + Send>, RegistryError> {
        let decoder = self
            .decoders
            .get(event_type)
            .ok_or_else(|| RegistryError::UnknownEventType(event_type.to_string()))?;
        decoder(payload)
    }

    /// Number of registered event types
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

/// Registry errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no decoder registered for event type: {0}")]
    UnknownEventType(String),

    #[error("payload decode failed: {0}")]
    DecodeFailed(String),
}
