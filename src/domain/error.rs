use crate::app::ConfigError;
use crate::sender::ClientError;
use thiserror::Error;

/// Top-level error type for building a shipper.
///
/// Only construction can fail. Once a shipper exists, nothing on the logging
/// path returns an error to the producer.
#[derive(Error, Debug)]
pub enum ShipperError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport setup error: {0}")]
    Client(#[from] ClientError),

    #[error("No tokio runtime available: {0}")]
    Runtime(String),
}
