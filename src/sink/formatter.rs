use crate::domain::LogRecord;

#[cfg(test)]
use mockall::automock;

/// Turns a structured record into the `rawstring` of an event.
#[cfg_attr(test, automock)]
pub trait LogFormatter: Send + Sync {
    fn format(&self, record: &LogRecord) -> String;
}

/// `logLevel=<LEVEL> filename='<file>' line=<n> <message>`
///
/// The `key=value` prefix is meant for the backend's kvparse.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleFormatter;

impl LogFormatter for SimpleFormatter {
    fn format(&self, record: &LogRecord) -> String {
        format!(
            "logLevel={} filename='{}' line={} {}",
            record.level,
            record.file.as_deref().unwrap_or_default(),
            record.line.unwrap_or(0),
            record.message
        )
    }
}
