use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Static key/value metadata attached to every event (device, build, logger id).
pub type Attributes = HashMap<String, String>;

/// A single log event as it travels from the producer to the ingest endpoint.
///
/// Events are immutable once created. The buffer owns them until a flush copies
/// them into a [`Batch`](crate::buffer::Batch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Milliseconds since the Unix epoch, fractional part preserved.
    pub timestamp: f64,
    /// Asks the backend to try `key=value` parsing of `rawstring`.
    pub kvparse: bool,
    pub attributes: Attributes,
    pub rawstring: String,
}

impl Event {
    pub fn new(timestamp: f64, attributes: Attributes, rawstring: impl Into<String>) -> Self {
        Self {
            timestamp,
            kvparse: true,
            attributes,
            rawstring: rawstring.into(),
        }
    }

    /// Event stamped with the current wall clock time.
    pub fn now(attributes: Attributes, rawstring: impl Into<String>) -> Self {
        Self::new(now_millis(), attributes, rawstring)
    }
}

/// Current time as fractional milliseconds since the Unix epoch.
pub fn now_millis() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1000.0
}
