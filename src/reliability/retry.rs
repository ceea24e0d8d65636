use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Stable key for one logical batch across all of its send attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptId(Uuid);

impl AttemptId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Resubmissions allowed after the first send.
    pub retry_limit: u32,
    /// Fixed wait between a failed send and its resubmission.
    pub retry_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_limit: 2,
            retry_delay: Duration::from_secs(5),
        }
    }
}

/// Where a tracked batch currently sits. Delivered and abandoned batches are
/// no longer tracked at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    InFlight,
    RetryScheduled,
}

/// Decision taken before each send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Go ahead; `attempt` is the 1-based number of this send.
    Send { attempt: u32 },
    /// Retry budget spent; the record has been removed.
    Abandon { attempts: u32 },
}

#[derive(Debug, Clone)]
struct AttemptRecord {
    attempts: u32,
    state: DeliveryState,
}

/// Maps attempt ids to retry counters.
///
/// An id is present only while its batch is in flight or waiting for a retry.
/// The tracker is owned by the dispatch queue task and needs no locking.
#[derive(Debug)]
pub struct AttemptTracker {
    config: RetryConfig,
    records: HashMap<AttemptId, AttemptRecord>,
}

impl AttemptTracker {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            records: HashMap::new(),
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Checks the counter against the retry limit and, if there is budget
    /// left, counts the upcoming send. Unknown ids start at zero.
    pub fn admit(&mut self, id: AttemptId) -> Admission {
        let sent_so_far = self.attempts(id);

        if sent_so_far > self.config.retry_limit {
            self.records.remove(&id);
            return Admission::Abandon {
                attempts: sent_so_far,
            };
        }

        let record = self.records.entry(id).or_insert_with(|| AttemptRecord {
            attempts: 0,
            state: DeliveryState::InFlight,
        });
        record.attempts = sent_so_far + 1;
        record.state = DeliveryState::InFlight;

        Admission::Send {
            attempt: record.attempts,
        }
    }

    /// Forgets a delivered batch. Returns how many sends it took.
    pub fn delivered(&mut self, id: AttemptId) -> Option<u32> {
        self.records.remove(&id).map(|record| record.attempts)
    }

    /// Marks a failed send as waiting for resubmission. Returns `false` if
    /// the id is not tracked.
    pub fn failed(&mut self, id: AttemptId) -> bool {
        match self.records.get_mut(&id) {
            Some(record) => {
                record.state = DeliveryState::RetryScheduled;
                true
            }
            None => false,
        }
    }

    pub fn attempts(&self, id: AttemptId) -> u32 {
        self.records
            .get(&id)
            .map(|record| record.attempts)
            .unwrap_or(0)
    }

    pub fn state(&self, id: AttemptId) -> Option<DeliveryState> {
        self.records.get(&id).map(|record| record.state)
    }

    pub fn contains(&self, id: AttemptId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
