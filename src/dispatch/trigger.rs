use super::queue::DispatchHandle;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// When a batch gets cut from the buffer.
///
/// `interval` drives a recurring flush, `bulk_size` flushes inline as soon as
/// that many events are pending. Either or both may be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushPolicy {
    pub interval: Option<Duration>,
    pub bulk_size: Option<usize>,
}

impl FlushPolicy {
    pub fn timer(interval: Duration) -> Self {
        Self {
            interval: Some(interval),
            bulk_size: None,
        }
    }

    pub fn threshold(bulk_size: usize) -> Self {
        Self {
            interval: None,
            bulk_size: Some(bulk_size),
        }
    }

    pub fn both(interval: Duration, bulk_size: usize) -> Self {
        Self {
            interval: Some(interval),
            bulk_size: Some(bulk_size),
        }
    }

    pub fn should_flush(&self, pending: usize) -> bool {
        self.bulk_size.is_some_and(|bulk| pending >= bulk.max(1))
    }
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self::timer(Duration::from_secs(10))
    }
}

/// Recurring task asking the dispatch queue to flush.
///
/// The task stops on [`stop`](Self::stop), when the timer is dropped, or once
/// the queue has shut down.
#[derive(Debug)]
pub struct FlushTimer {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl FlushTimer {
    pub fn spawn(period: Duration, dispatch: DispatchHandle) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            // First tick one full period after start, not immediately.
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if dispatch.is_closed() {
                            break;
                        }
                        dispatch.flush();
                    }
                }
            }
            debug!("Flush timer stopped");
        });

        Self { cancel, handle }
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for FlushTimer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{DispatchQueue, DispatchSettings};
    use crate::domain::{Attributes, Event};
    use crate::test_support::ScriptedTransport;

    fn event(text: &str) -> Event {
        Event::new(0.0, Attributes::new(), text)
    }

    #[test]
    fn test_should_flush() {
        assert!(!FlushPolicy::timer(Duration::from_secs(1)).should_flush(1_000));
        assert!(FlushPolicy::threshold(1).should_flush(1));
        assert!(!FlushPolicy::threshold(5).should_flush(4));
        assert!(FlushPolicy::both(Duration::from_secs(1), 5).should_flush(5));
    }

    #[test]
    fn test_default_policy_is_ten_second_timer() {
        let policy = FlushPolicy::default();
        assert_eq!(policy.interval, Some(Duration::from_secs(10)));
        assert_eq!(policy.bulk_size, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_sends_accumulated_events_on_tick() {
        let transport = ScriptedTransport::new();
        let settings = DispatchSettings {
            policy: FlushPolicy::both(Duration::from_secs(10), 5),
            ..Default::default()
        };
        let (dispatch, _stats) = DispatchQueue::spawn_with_stats(settings, transport.clone());
        let timer = FlushTimer::spawn(Duration::from_secs(10), dispatch.clone());

        for text in ["a", "b", "c", "d"] {
            dispatch.append(event(text));
        }

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(transport.request_count(), 0);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(dispatch.drain().await);

        let batches = transport.decoded_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 4);
        assert!(timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_timer_no_longer_flushes() {
        let transport = ScriptedTransport::new();
        let (dispatch, _stats) =
            DispatchQueue::spawn_with_stats(DispatchSettings::default(), transport.clone());
        let timer = FlushTimer::spawn(Duration::from_secs(10), dispatch.clone());

        timer.stop();
        dispatch.append(event("late"));
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(transport.request_count(), 0);
        assert!(!timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_ticks_never_send() {
        let transport = ScriptedTransport::new();
        let (dispatch, stats) =
            DispatchQueue::spawn_with_stats(DispatchSettings::default(), transport.clone());
        let _timer = FlushTimer::spawn(Duration::from_secs(10), dispatch.clone());

        tokio::time::sleep(Duration::from_secs(45)).await;

        assert_eq!(transport.request_count(), 0);
        assert_eq!(stats.snapshot().batches_cut, 0);
    }
}
