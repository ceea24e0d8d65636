use super::formatter::{LogFormatter, SimpleFormatter};
use super::metadata::{HostMetadata, MetadataProvider};
use super::{LOGGER_NAME, LogSink};
use crate::app::Config;
use crate::dispatch::{DispatchHandle, DispatchQueue, FlushPolicy, FlushTimer};
use crate::domain::{Attributes, Event, LogRecord, ShipperError};
use crate::sender::{DeliveryStats, DeliveryStatsSnapshot, HttpTransport, Transport};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Ships log records to a Humio dataspace.
///
/// `emit`/`log` only enqueue work for the dispatch queue, so they never block
/// and never fail. Delivery problems are handled (and eventually given up on)
/// inside the queue.
///
/// Construction spawns tasks and must happen inside a tokio runtime.
pub struct LogShipper {
    logger_id: String,
    attributes: Attributes,
    formatter: RwLock<Arc<dyn LogFormatter>>,
    omit_escape_characters: bool,
    verbose: Arc<AtomicBool>,
    policy: FlushPolicy,
    dispatch: DispatchHandle,
    timer: Mutex<Option<FlushTimer>>,
    stats: Arc<DeliveryStats>,
    shutdown_timeout: Duration,
}

impl LogShipper {
    /// Shipper posting over HTTPS to the configured ingest endpoint.
    pub fn new(mut config: Config) -> Result<Self, ShipperError> {
        config.post_process()?;
        config.validate()?;
        let transport = HttpTransport::new(config.client_config()?)?;
        Self::with_transport(config, transport)
    }

    /// Shipper delivering through a caller-supplied transport.
    pub fn with_transport<T: Transport>(config: Config, transport: T) -> Result<Self, ShipperError> {
        let metadata = HostMetadata::detect()
            .with_versions(config.app_version.as_deref(), config.build_version.as_deref());
        Self::with_parts(config, transport, &metadata)
    }

    pub fn with_parts<T: Transport>(
        mut config: Config,
        transport: T,
        metadata: &dyn MetadataProvider,
    ) -> Result<Self, ShipperError> {
        tokio::runtime::Handle::try_current()
            .map_err(|e| ShipperError::Runtime(e.to_string()))?;

        config.post_process()?;
        config.validate()?;

        let logger_id = config
            .logger_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut attributes = metadata.attributes();
        attributes.insert("loggerId".to_string(), logger_id.clone());

        let settings = config.dispatch_settings()?;
        let policy = settings.policy;
        let stats = Arc::new(DeliveryStats::new());
        let verbose = Arc::new(AtomicBool::new(config.verbose));

        let (dispatch, _task) = DispatchQueue::spawn(
            settings,
            Arc::new(transport),
            Arc::clone(&stats),
            Arc::clone(&verbose),
        );

        let shipper = Self {
            logger_id,
            attributes,
            formatter: RwLock::new(Arc::new(SimpleFormatter)),
            omit_escape_characters: config.omit_escape_characters,
            verbose,
            policy,
            dispatch,
            timer: Mutex::new(None),
            stats,
            shutdown_timeout: config.shutdown_timeout,
        };
        shipper.start();

        info!(
            "Log shipper {} started (flush interval {:?}, bulk size {:?}, retry limit {})",
            shipper.logger_id, policy.interval, policy.bulk_size, config.retry_limit
        );
        Ok(shipper)
    }

    /// Starts the flush timer, if the policy has one and it is not running.
    pub fn start(&self) {
        let Some(interval) = self.policy.interval else {
            return;
        };

        let mut timer = self.timer.lock();
        if timer.as_ref().is_some_and(FlushTimer::is_running) {
            return;
        }
        *timer = Some(FlushTimer::spawn(interval, self.dispatch.clone()));
        debug!("Flush timer started ({:?})", interval);
    }

    /// Stops the flush timer. Buffered events stay buffered until the next
    /// explicit flush or a restart of the timer.
    pub fn stop(&self) {
        if let Some(timer) = self.timer.lock().take() {
            timer.stop();
        }
    }

    /// Appends a ready-made event.
    pub fn log(&self, event: Event) {
        self.dispatch.append(event);
    }

    /// Flushes, then waits until nothing is in flight or `timeout` passes.
    /// Returns whether everything settled in time. Settled means delivered or
    /// given up on, not necessarily delivered.
    pub async fn flush_and_drain(&self, timeout: Duration) -> bool {
        self.dispatch.flush();
        tokio::time::timeout(timeout, self.dispatch.drain())
            .await
            .unwrap_or(false)
    }

    /// Stops the timer and makes a bounded best-effort delivery of what is
    /// buffered, using the configured shutdown timeout.
    pub async fn shutdown(&self) -> bool {
        self.stop();
        let drained = self.flush_and_drain(self.shutdown_timeout).await;
        if !drained {
            warn!(
                "Shutdown timeout ({:?}) reached with deliveries still pending",
                self.shutdown_timeout
            );
        }
        drained
    }

    pub fn set_formatter(&self, formatter: Arc<dyn LogFormatter>) {
        *self.formatter.write() = formatter;
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    pub fn logger_id(&self) -> &str {
        &self.logger_id
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn stats(&self) -> DeliveryStatsSnapshot {
        self.stats.snapshot()
    }

    fn raw_message(&self, record: &LogRecord) -> String {
        let text = self.formatter.read().format(record);
        if self.omit_escape_characters {
            text.replace('\\', "")
        } else {
            text
        }
    }
}

impl LogSink for LogShipper {
    fn emit(&self, record: &LogRecord) {
        let rawstring = self.raw_message(record);
        self.log(Event::now(self.attributes.clone(), rawstring));
    }

    fn flush(&self) {
        self.dispatch.flush();
    }

    fn set_verbose(&self, verbose: bool) {
        self.verbose.store(verbose, Ordering::Relaxed);
    }

    fn name(&self) -> &str {
        LOGGER_NAME
    }
}

impl std::fmt::Debug for LogShipper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogShipper")
            .field("logger_id", &self.logger_id)
            .field("policy", &self.policy)
            .field("verbose", &self.is_verbose())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}
