mod cli;
mod validation;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Access token is not set (use --access-token or HUMIO_ACCESS_TOKEN)")]
    MissingAccessToken,
    #[error("Dataspace is not set (use --dataspace or HUMIO_DATASPACE)")]
    MissingDataspace,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Argument error: {0}")]
    ArgError(#[from] clap::Error),
}

/// Level of the shipper's own diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Caching behaviour requested from intermediaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CachePolicy {
    /// Leave caching to the protocol defaults
    #[default]
    Protocol,
    /// Ask every hop to bypass its cache
    Reload,
}

/// Which flush triggers are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlushMode {
    /// Flush on a recurring timer
    #[default]
    Timer,
    /// Flush whenever the buffer reaches the bulk size
    Threshold,
    /// Timer and bulk size, whichever comes first
    Both,
}

pub use cli::{Config, DEFAULT_BASE_URL};
