use crate::domain::Event;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-logger tags sent with every batch.
pub type Tags = HashMap<String, String>;

/// An immutable snapshot of tags plus the events cut from the buffer at flush
/// time. Serializes to one element of the ingest body array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    tags: Tags,
    events: Vec<Event>,
}

impl Batch {
    pub fn new(tags: Tags, events: Vec<Event>) -> Self {
        Self { tags, events }
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
