pub mod config;
pub mod logging_system;
pub mod shutdown;

pub use config::{CachePolicy, Config, ConfigError, FlushMode, LogLevel};
pub use logging_system::{LoggingError, setup_logging};

use crate::domain::{LogLevel as RecordLevel, LogRecord, ShipperError};
use crate::sender::DeliveryStatsSnapshot;
use crate::sink::{LogShipper, LogSink};
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

/// Command-line host: every line read from the input becomes one INFO record.
pub struct App {
    shipper: LogShipper,
}

impl App {
    pub fn from_config(config: Config) -> Result<Self, ShipperError> {
        let shipper = LogShipper::new(config)?;
        Ok(Self { shipper })
    }

    /// Ships `input` until it ends, fails, or a shutdown signal arrives, then
    /// makes a bounded attempt to deliver what is left. A read error is
    /// returned only after that attempt.
    pub async fn run<R>(self, input: R) -> anyhow::Result<DeliveryStatsSnapshot>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let signal = shutdown::wait_for_signal();
        tokio::pin!(signal);

        let mut read_error = None;
        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) if line.trim().is_empty() => continue,
                    Ok(Some(line)) => self.shipper.emit(&LogRecord::new(RecordLevel::Info, line)),
                    Ok(None) => {
                        info!("End of input reached");
                        break;
                    }
                    Err(e) => {
                        error!("Failed to read input: {}", e);
                        read_error = Some(e);
                        break;
                    }
                },
                _ = &mut signal => break,
            }
        }

        if !self.shipper.shutdown().await {
            warn!("Some batches were still in flight at exit");
        }

        let stats = self.shipper.stats();
        info!(
            "Shipped {} events in {} requests ({} delivered, {} abandoned)",
            stats.events_accepted,
            stats.requests_sent,
            stats.deliveries_succeeded,
            stats.batches_abandoned
        );

        match read_error {
            Some(e) => Err(e.into()),
            None => Ok(stats),
        }
    }
}

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

// Main entry point for the application
pub async fn main() -> anyhow::Result<()> {
    // clap prints help/version and exits on its own
    let config = Config::parse().resolve()?;
    setup_logging(config.log_level, config.log_json)?;

    info!("Starting humio-shipper v{}", get_version());
    info!(
        "Configuration: endpoint={}, flush_mode={:?}, retry_limit={}",
        config.ingest_url()?,
        config.flush_mode,
        config.retry_limit
    );

    let app = match App::from_config(config) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to start: {}", e);
            return Err(e.into());
        }
    };

    app.run(BufReader::new(tokio::io::stdin())).await?;
    Ok(())
}
