//! Domain layer for humio-shipper.
//!
//! Contains the canonical types shared across all modules:
//! - `Event`: the immutable record appended on every log call
//! - `LogRecord`: the structured record a host logging frontend hands over
//! - `LogLevel`: record severity (Error/Warning/Info/Debug/Verbose)
//! - `ShipperError`: top-level construction error

pub mod error;
pub mod event;
pub mod log_level;
pub mod record;

pub use error::ShipperError;
pub use event::{Attributes, Event};
pub use log_level::LogLevel;
pub use record::LogRecord;
