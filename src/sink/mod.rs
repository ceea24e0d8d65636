//! The shipper as seen by a host logging frontend.

pub mod formatter;
pub mod layer;
pub mod metadata;
pub mod shipper;

pub use formatter::{LogFormatter, SimpleFormatter};
pub use layer::ShipperLayer;
pub use metadata::{HostMetadata, MetadataProvider};
pub use shipper::LogShipper;

use crate::domain::LogRecord;

/// Name under which the shipper registers with a host frontend, also sent as
/// the default `source` tag.
pub const LOGGER_NAME: &str = "HumioShipper";

/// What a host logging frontend needs from a log destination.
///
/// None of these calls block on the network or report delivery errors.
pub trait LogSink: Send + Sync {
    fn emit(&self, record: &LogRecord);

    /// Requests that everything emitted so far be sent without waiting for
    /// the next scheduled flush.
    fn flush(&self);

    fn set_verbose(&self, verbose: bool);

    fn name(&self) -> &str;
}
