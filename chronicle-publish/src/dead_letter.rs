//! Dead-letter records
//!
//! Created when publish retries are exhausted; the record carries the
//! original wire envelope so no event is ever silently lost.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Why a delivery dead-lettered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterCause {
    /// Human-readable failure message
    pub message: String,

    /// Short classification code
    pub code: String,
}

/// An event whose publication exhausted retries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterRecord {
    /// The original event in its canonical wire shape
    pub original_event: Value,

    /// The failure that exhausted retries
    pub error: DeadLetterCause,

    /// When publication finally failed
    pub failed_at: DateTime<Utc>,

    /// Redelivery attempts made from the dead-letter channel
    pub retry_count: u32,
}

impl DeadLetterRecord {
    /// Capture a failed publication
    pub fn new(original_event: Value, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            original_event,
            error: DeadLetterCause {
                message: message.into(),
                code: code.into(),
            },
            failed_at: Utc::now(),
            retry_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_shape() {
        let record = DeadLetterRecord::new(
            json!({"event_id": "abc"}),
            "delivery failed: broker down",
            "delivery",
        );

        let wire = serde_json::to_value(&record).unwrap();
        assert_eq!(wire["original_event"]["event_id"], json!("abc"));
        assert_eq!(wire["error"]["code"], json!("delivery"));
        assert_eq!(wire["retry_count"], json!(0));
        assert!(wire.get("failed_at").is_some());
    }
}
