// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_possible_truncation, // Millisecond timestamps fit comfortably in f64/u64
    clippy::cast_precision_loss,      // Acceptable for timestamps and rates
    clippy::missing_errors_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. ConfigError in config module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

pub mod app;
pub mod buffer;
pub mod dispatch;
pub mod domain;
pub mod reliability;
pub mod sender;
pub mod sink;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main types for easy access
pub use app::{App, Config};
pub use domain::{Event, LogLevel, LogRecord, ShipperError};
pub use sink::{LogShipper, LogSink, ShipperLayer};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
