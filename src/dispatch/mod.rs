//! Single-consumer dispatch queue and the triggers that feed it flushes.
//!
//! Every mutation of the pending buffer and the attempt tracker happens on the
//! queue's own task. Producers, the flush timer, in-flight requests and retry
//! timers only ever send it commands.

/// Emits a diagnostic at `info` when the shipper is verbose, `debug` otherwise.
macro_rules! diag {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!($($arg)+);
        } else {
            tracing::debug!($($arg)+);
        }
    };
}

pub mod queue;
pub mod trigger;

pub use queue::{DispatchHandle, DispatchQueue, DispatchSettings};
pub use trigger::{FlushPolicy, FlushTimer};
