use super::LogSink;
use crate::domain::{LogLevel, LogRecord};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

// Events from these targets are never forwarded: the shipper's own
// diagnostics and the HTTP stack it posts with would otherwise loop back.
const SKIPPED_TARGETS: &[&str] = &[
    "humio_shipper",
    "reqwest",
    "hyper",
    "hyper_util",
    "h2",
    "rustls",
    "tokio",
];

/// Forwards `tracing` events to a [`LogSink`].
///
/// The event message becomes the record message, other fields are appended
/// as `key=value` pairs so the backend's kvparse picks them up.
pub struct ShipperLayer<K> {
    sink: Arc<K>,
}

impl<K: LogSink> ShipperLayer<K> {
    pub fn new(sink: Arc<K>) -> Self {
        Self { sink }
    }
}

impl<S, K> Layer<S> for ShipperLayer<K>
where
    S: Subscriber,
    K: LogSink + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if is_skipped(metadata.target()) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let record = LogRecord {
            level: LogLevel::from(metadata.level()),
            file: metadata.file().map(str::to_string),
            line: metadata.line(),
            message: visitor.finish(),
        };
        self.sink.emit(&record);
    }
}

fn is_skipped(target: &str) -> bool {
    SKIPPED_TARGETS.iter().any(|skipped| {
        target == *skipped
            || target
                .strip_prefix(skipped)
                .is_some_and(|rest| rest.starts_with("::"))
    })
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields,
            (false, false) => format!("{} {}", self.message, self.fields),
        }
    }

    fn push_field(&mut self, name: &str, value: std::fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{name}={value}");
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.push_field(field.name(), format_args!("{value}"));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.push_field(field.name(), format_args!("{value:?}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Default)]
    struct RecordingSink {
        records: Mutex<Vec<LogRecord>>,
    }

    impl LogSink for RecordingSink {
        fn emit(&self, record: &LogRecord) {
            self.records.lock().push(record.clone());
        }

        fn flush(&self) {}

        fn set_verbose(&self, _verbose: bool) {}

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn capture(f: impl FnOnce()) -> Vec<LogRecord> {
        let sink = Arc::new(RecordingSink::default());
        let subscriber = tracing_subscriber::registry().with(ShipperLayer::new(Arc::clone(&sink)));
        tracing::subscriber::with_default(subscriber, f);
        let records = sink.records.lock().clone();
        records
    }

    #[test]
    fn test_event_becomes_record() {
        let records = capture(|| {
            tracing::warn!(target: "app::auth", user = "bob", attempts = 3, "login failed");
        });

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.level, LogLevel::Warning);
        assert_eq!(record.message, "login failed user=bob attempts=3");
        assert!(record.file.as_deref().is_some_and(|f| f.ends_with("layer.rs")));
        assert!(record.line.is_some());
    }

    #[test]
    fn test_fields_only_event() {
        let records = capture(|| {
            tracing::info!(target: "app", order_id = 17);
        });

        assert_eq!(records[0].message, "order_id=17");
    }

    #[test]
    fn test_own_and_http_stack_targets_are_skipped() {
        let records = capture(|| {
            tracing::info!(target: "humio_shipper::dispatch::queue", "internal");
            tracing::debug!(target: "hyper_util::client", "pooled");
            tracing::info!(target: "hyperdrive", "kept");
        });

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "kept");
    }

    #[test]
    fn test_trace_maps_to_verbose() {
        let records = capture(|| tracing::trace!(target: "app", "fine detail"));
        assert_eq!(records[0].level, LogLevel::Verbose);
    }
}
