use super::log_level::LogLevel;

/// A structured log record as delivered by the host logging frontend.
///
/// The shipper never sends records directly; a formatter turns each one into
/// the `rawstring` of an [`Event`](super::Event).
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub message: String,
}

impl LogRecord {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            file: None,
            line: None,
            message: message.into(),
        }
    }

    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }
}
