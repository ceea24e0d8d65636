use super::batch::{Batch, Tags};
use crate::domain::Event;

/// Ordered list of events waiting for the next flush.
///
/// Owned by the dispatch queue task and never shared, so it carries no
/// synchronization of its own.
#[derive(Debug, Default)]
pub struct Buffer {
    events: Vec<Event>,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Swaps the pending events for an empty list and wraps them in a batch.
    ///
    /// Returns `None` when nothing is pending, so an empty flush never reaches
    /// the transport.
    pub fn cut(&mut self, tags: &Tags) -> Option<Batch> {
        if self.events.is_empty() {
            return None;
        }

        let events = std::mem::take(&mut self.events);
        Some(Batch::new(tags.clone(), events))
    }
}
