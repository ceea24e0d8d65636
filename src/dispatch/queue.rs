use super::trigger::FlushPolicy;
use crate::buffer::{Buffer, Tags};
use crate::domain::Event;
use crate::reliability::{Admission, AttemptId, AttemptTracker, RetryConfig};
use crate::sender::{BatchSerializer, DeliveryStats, IngestRequest, Transport, TransportError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Work items processed, in arrival order, by the queue task.
#[derive(Debug)]
enum Command {
    Append(Event),
    Flush,
    Resubmit(IngestRequest),
    Completed {
        request: IngestRequest,
        result: Result<(), TransportError>,
    },
    Drain(oneshot::Sender<()>),
}

#[derive(Debug, Clone, Default)]
pub struct DispatchSettings {
    pub tags: Tags,
    pub policy: FlushPolicy,
    pub retry: RetryConfig,
}

/// Cloneable, non-blocking entry point into the dispatch queue.
///
/// Sending never waits: the channel is unbounded and a closed queue silently
/// discards the command, so nothing here can fail or stall a logging call.
#[derive(Debug, Clone)]
pub struct DispatchHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl DispatchHandle {
    pub fn append(&self, event: Event) {
        let _ = self.tx.send(Command::Append(event));
    }

    /// Cuts whatever has been appended before this call into one batch.
    pub fn flush(&self) {
        let _ = self.tx.send(Command::Flush);
    }

    /// Resolves once no batch is in flight or waiting for a retry. Returns
    /// `false` if the queue is gone.
    pub async fn drain(&self) -> bool {
        let (reply, done) = oneshot::channel();
        if self.tx.send(Command::Drain(reply)).is_err() {
            return false;
        }
        done.await.is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Owner of the pending buffer and the attempt tracker.
///
/// Runs as a single task; since only that task touches its state, no locks
/// are needed and every batch is a disjoint, ordered slice of the appended
/// events.
pub struct DispatchQueue<T: Transport> {
    rx: mpsc::UnboundedReceiver<Command>,
    // Weak so that dropping every handle lets the loop finish.
    tx: mpsc::WeakUnboundedSender<Command>,
    buffer: Buffer,
    tags: Tags,
    policy: FlushPolicy,
    tracker: AttemptTracker,
    transport: Arc<T>,
    serializer: BatchSerializer,
    stats: Arc<DeliveryStats>,
    verbose: Arc<AtomicBool>,
    drain_waiters: Vec<oneshot::Sender<()>>,
}

impl<T: Transport> DispatchQueue<T> {
    /// Starts the queue task on the current tokio runtime.
    pub fn spawn(
        settings: DispatchSettings,
        transport: Arc<T>,
        stats: Arc<DeliveryStats>,
        verbose: Arc<AtomicBool>,
    ) -> (DispatchHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let queue = Self {
            rx,
            tx: tx.downgrade(),
            buffer: Buffer::new(),
            tags: settings.tags,
            policy: settings.policy,
            tracker: AttemptTracker::new(settings.retry),
            transport,
            serializer: BatchSerializer::new(),
            stats,
            verbose,
            drain_waiters: Vec::new(),
        };

        let handle = tokio::spawn(queue.run());
        (DispatchHandle { tx }, handle)
    }

    async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            self.handle(command);
        }

        if !self.buffer.is_empty() {
            warn!(
                "Dispatch queue closed with {} unsent events",
                self.buffer.len()
            );
        }
        debug!("Dispatch queue stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Append(event) => {
                self.stats.record_event();
                self.buffer.push(event);
                if self.policy.should_flush(self.buffer.len()) {
                    self.flush_buffer();
                }
            }
            Command::Flush => self.flush_buffer(),
            Command::Resubmit(request) => self.submit(request),
            Command::Completed { request, result } => self.complete(request, result),
            Command::Drain(reply) => {
                self.drain_waiters.push(reply);
                self.notify_if_idle();
            }
        }
    }

    fn verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    fn flush_buffer(&mut self) {
        let Some(batch) = self.buffer.cut(&self.tags) else {
            return;
        };
        self.stats.record_batch_cut();

        diag!(self.verbose(), "About to post {} events", batch.len());

        match self.serializer.encode(&batch) {
            Ok(body) => self.submit(IngestRequest {
                attempt: AttemptId::new(),
                body,
                event_count: batch.len(),
            }),
            Err(e) => {
                self.stats.record_unserializable();
                error!("Dropping batch of {} events: {}", batch.len(), e);
            }
        }
    }

    fn submit(&mut self, request: IngestRequest) {
        match self.tracker.admit(request.attempt) {
            Admission::Abandon { attempts } => {
                self.stats.record_abandoned();
                warn!(
                    "Giving up on batch {} ({} events) after {} attempts",
                    request.attempt, request.event_count, attempts
                );
                self.notify_if_idle();
            }
            Admission::Send { attempt } => {
                self.stats.record_request_sent();
                diag!(
                    self.verbose(),
                    "Sending batch {} ({} events, {} bytes, attempt {})",
                    request.attempt,
                    request.event_count,
                    request.body.len(),
                    attempt
                );
                self.spawn_delivery(request);
            }
        }
    }

    fn spawn_delivery(&self, request: IngestRequest) {
        let transport = Arc::clone(&self.transport);
        let completions = self.tx.upgrade();

        tokio::spawn(async move {
            let result = transport.deliver(request.clone()).await;
            match completions {
                Some(tx) => {
                    let _ = tx.send(Command::Completed { request, result });
                }
                None => debug!(
                    "Queue closed; outcome of batch {} is not tracked",
                    request.attempt
                ),
            }
        });
    }

    fn complete(&mut self, request: IngestRequest, result: Result<(), TransportError>) {
        match result {
            Ok(()) => {
                self.stats.record_delivery();
                if let Some(attempts) = self.tracker.delivered(request.attempt) {
                    diag!(
                        self.verbose(),
                        "Delivered batch {} ({} events) after {} attempt(s)",
                        request.attempt,
                        request.event_count,
                        attempts
                    );
                }
                self.notify_if_idle();
            }
            Err(e) => {
                self.stats.record_failure();
                if self.tracker.failed(request.attempt) {
                    self.schedule_retry(request, e);
                }
            }
        }
    }

    fn schedule_retry(&mut self, request: IngestRequest, cause: TransportError) {
        let delay = self.tracker.config().retry_delay;

        let Some(tx) = self.tx.upgrade() else {
            self.tracker.delivered(request.attempt);
            warn!(
                "Queue closed; dropping failed batch {} ({} events): {}",
                request.attempt, request.event_count, cause
            );
            self.notify_if_idle();
            return;
        };

        self.stats.record_retry_scheduled();
        if self.verbose() {
            warn!(
                "Failed to send batch {}, retrying in {:?}: {}",
                request.attempt, delay, cause
            );
        } else {
            debug!(
                "Failed to send batch {}, retrying in {:?}: {}",
                request.attempt, delay, cause
            );
        }

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Command::Resubmit(request));
        });
    }

    fn notify_if_idle(&mut self) {
        if !self.tracker.is_empty() {
            return;
        }
        for waiter in self.drain_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }
}

#[cfg(test)]
impl<T: Transport> DispatchQueue<T> {
    pub(crate) fn spawn_with_stats(
        settings: DispatchSettings,
        transport: T,
    ) -> (DispatchHandle, Arc<DeliveryStats>) {
        let stats = Arc::new(DeliveryStats::new());
        let (handle, _task) = Self::spawn(
            settings,
            Arc::new(transport),
            Arc::clone(&stats),
            Arc::new(AtomicBool::new(false)),
        );
        (handle, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Attributes;
    use crate::test_support::ScriptedTransport;
    use std::collections::HashSet;
    use std::time::Duration;

    fn event(text: impl Into<String>) -> Event {
        Event::new(0.0, Attributes::new(), text)
    }

    fn settings(policy: FlushPolicy, retry_limit: u32) -> DispatchSettings {
        DispatchSettings {
            tags: Tags::from([("source".to_string(), "test".to_string())]),
            policy,
            retry: RetryConfig {
                retry_limit,
                retry_delay: Duration::from_secs(5),
            },
        }
    }

    fn server_error() -> Result<(), TransportError> {
        Err(TransportError::HttpStatus { status: 500 })
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_flush_never_sends() {
        let transport = ScriptedTransport::new();
        let (dispatch, stats) = DispatchQueue::spawn_with_stats(
            settings(FlushPolicy::default(), 2),
            transport.clone(),
        );

        dispatch.flush();
        dispatch.flush();
        assert!(dispatch.drain().await);

        assert_eq!(transport.request_count(), 0);
        assert_eq!(stats.snapshot().batches_cut, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_sends_snapshot_and_forgets_attempt() {
        let transport = ScriptedTransport::new();
        let (dispatch, stats) = DispatchQueue::spawn_with_stats(
            settings(FlushPolicy::default(), 2),
            transport.clone(),
        );

        dispatch.append(event("one"));
        dispatch.append(event("two"));
        dispatch.flush();
        assert!(dispatch.drain().await);

        let batches = transport.decoded_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].tags()["source"], "test");
        let raw: Vec<_> = batches[0].events().iter().map(|e| e.rawstring.clone()).collect();
        assert_eq!(raw, vec!["one", "two"]);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.deliveries_succeeded, 1);
        assert_eq!(snapshot.requests_sent, 1);

        // A second flush finds nothing left to send.
        dispatch.flush();
        assert!(dispatch.drain().await);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_appends_after_flush_go_to_next_batch() {
        let transport = ScriptedTransport::new();
        let (dispatch, _stats) = DispatchQueue::spawn_with_stats(
            settings(FlushPolicy::default(), 2),
            transport.clone(),
        );

        dispatch.append(event("before"));
        dispatch.flush();
        dispatch.append(event("after"));
        dispatch.flush();
        assert!(dispatch.drain().await);

        let batches = transport.decoded_batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].events()[0].rawstring, "before");
        assert_eq!(batches[1].events()[0].rawstring, "after");
        assert_eq!(batches[0].len() + batches[1].len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_failures_with_retry_limit_two_abandon_batch() {
        let transport = ScriptedTransport::with_outcomes(vec![
            server_error(),
            server_error(),
            server_error(),
        ]);
        let (dispatch, stats) = DispatchQueue::spawn_with_stats(
            settings(FlushPolicy::default(), 2),
            transport.clone(),
        );

        dispatch.append(event("doomed"));
        dispatch.flush();
        assert!(dispatch.drain().await);

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests.iter().all(|r| r.attempt == requests[0].attempt));
        assert!(requests.iter().all(|r| r.body == requests[0].body));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.requests_failed, 3);
        assert_eq!(snapshot.batches_abandoned, 1);
        assert_eq!(snapshot.deliveries_succeeded, 0);

        // Nothing ever comes back for the abandoned batch.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_waits_fixed_delay_then_succeeds() {
        let transport = ScriptedTransport::with_outcomes(vec![server_error(), Ok(())]);
        let (dispatch, stats) = DispatchQueue::spawn_with_stats(
            settings(FlushPolicy::default(), 2),
            transport.clone(),
        );

        let start = tokio::time::Instant::now();
        dispatch.append(event("eventually"));
        dispatch.flush();
        assert!(dispatch.drain().await);

        assert!(start.elapsed() >= Duration::from_secs(5));
        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].attempt, requests[1].attempt);
        assert_eq!(requests[0].body, requests[1].body);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.deliveries_succeeded, 1);
        assert_eq!(snapshot.retries_scheduled, 1);
        assert_eq!(snapshot.batches_abandoned, 0);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bulk_size_one_sends_each_event_immediately() {
        let transport = ScriptedTransport::new();
        let (dispatch, _stats) = DispatchQueue::spawn_with_stats(
            settings(FlushPolicy::threshold(1), 2),
            transport.clone(),
        );

        for n in 0..3 {
            dispatch.append(event(format!("event {n}")));
        }
        assert!(dispatch.drain().await);

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        let ids: HashSet<_> = requests.iter().map(|r| r.attempt).collect();
        assert_eq!(ids.len(), 3);

        let batches = transport.decoded_batches();
        for (n, batch) in batches.iter().enumerate() {
            assert_eq!(batch.len(), 1);
            assert_eq!(batch.events()[0].rawstring, format!("event {n}"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_threshold_holds_events_below_bulk_size() {
        let transport = ScriptedTransport::new();
        let (dispatch, _stats) = DispatchQueue::spawn_with_stats(
            settings(FlushPolicy::threshold(3), 2),
            transport.clone(),
        );

        for n in 0..7 {
            dispatch.append(event(format!("{n}")));
        }
        assert!(dispatch.drain().await);

        let sizes: Vec<_> = transport.decoded_batches().iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![3, 3]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_arrive_exactly_once_in_order() {
        const PRODUCERS: usize = 8;
        const PER_PRODUCER: usize = 250;

        let transport = ScriptedTransport::new();
        let (dispatch, stats) = DispatchQueue::spawn_with_stats(
            settings(FlushPolicy::default(), 2),
            transport.clone(),
        );

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let dispatch = dispatch.clone();
                std::thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        dispatch.append(event(format!("{p}:{i}")));
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        dispatch.flush();
        assert!(dispatch.drain().await);

        let batches = transport.decoded_batches();
        assert_eq!(batches.len(), 1);
        let events = batches[0].events();
        assert_eq!(events.len(), PRODUCERS * PER_PRODUCER);
        assert_eq!(stats.snapshot().events_accepted as usize, PRODUCERS * PER_PRODUCER);

        let mut next = [0usize; PRODUCERS];
        for event in events {
            let (p, i) = event.rawstring.split_once(':').unwrap();
            let (p, i): (usize, usize) = (p.parse().unwrap(), i.parse().unwrap());
            assert_eq!(i, next[p], "producer {p} out of order");
            next[p] += 1;
        }
        assert!(next.iter().all(|&n| n == PER_PRODUCER));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_on_idle_queue_returns_immediately() {
        let transport = ScriptedTransport::new();
        let (dispatch, _stats) =
            DispatchQueue::spawn_with_stats(DispatchSettings::default(), transport);

        assert!(dispatch.drain().await);
    }

    #[tokio::test]
    async fn test_queue_stops_when_handles_dropped() {
        let transport = ScriptedTransport::new();
        let (dispatch, task) = DispatchQueue::spawn(
            DispatchSettings::default(),
            Arc::new(transport),
            Arc::new(DeliveryStats::new()),
            Arc::new(AtomicBool::new(false)),
        );

        drop(dispatch);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("queue task should exit")
            .unwrap();
    }
}
