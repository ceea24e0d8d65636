// Lock-free delivery statistics
//
// Counters are bumped from the dispatch queue and read from any thread.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct DeliveryStats {
    events_accepted: AtomicU64,
    batches_cut: AtomicU64,
    requests_sent: AtomicU64,
    deliveries_succeeded: AtomicU64,
    requests_failed: AtomicU64,
    retries_scheduled: AtomicU64,
    batches_abandoned: AtomicU64,
    batches_unserializable: AtomicU64,
}

impl DeliveryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event(&self) {
        self.events_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch_cut(&self) {
        self.batches_cut.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request_sent(&self) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery(&self) {
        self.deliveries_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry_scheduled(&self) {
        self.retries_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_abandoned(&self) {
        self.batches_abandoned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unserializable(&self) {
        self.batches_unserializable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DeliveryStatsSnapshot {
        DeliveryStatsSnapshot {
            events_accepted: self.events_accepted.load(Ordering::Relaxed),
            batches_cut: self.batches_cut.load(Ordering::Relaxed),
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            deliveries_succeeded: self.deliveries_succeeded.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            retries_scheduled: self.retries_scheduled.load(Ordering::Relaxed),
            batches_abandoned: self.batches_abandoned.load(Ordering::Relaxed),
            batches_unserializable: self.batches_unserializable.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryStatsSnapshot {
    pub events_accepted: u64,
    pub batches_cut: u64,
    pub requests_sent: u64,
    pub deliveries_succeeded: u64,
    pub requests_failed: u64,
    pub retries_scheduled: u64,
    pub batches_abandoned: u64,
    pub batches_unserializable: u64,
}

impl DeliveryStatsSnapshot {
    /// Fraction of sent requests that succeeded (1.0 when nothing was sent).
    pub fn success_rate(&self) -> f64 {
        if self.requests_sent == 0 {
            return 1.0;
        }
        self.deliveries_succeeded as f64 / self.requests_sent as f64
    }
}
