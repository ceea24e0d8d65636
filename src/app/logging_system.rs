use super::config::LogLevel;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },
    #[error("Global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

// The HTTP stack is noisy at debug level; keep it at warn unless RUST_LOG says otherwise.
const DEFAULT_DIRECTIVES: &[&str] = &[
    "hyper=warn",
    "hyper_util=warn",
    "reqwest=warn",
    "h2=warn",
    "rustls=warn",
];

/// Filter string for the given level plus the quiet defaults.
pub fn build_filter_string(level: LogLevel) -> String {
    let level = tracing::Level::from(level).as_str().to_lowercase();
    std::iter::once(level.as_str())
        .chain(DEFAULT_DIRECTIVES.iter().copied())
        .collect::<Vec<_>>()
        .join(",")
}

/// Installs the global subscriber for the shipper's own diagnostics.
/// `RUST_LOG` takes precedence over `level` when set.
pub fn setup_logging(level: LogLevel, json: bool) -> Result<(), LoggingError> {
    let filter_string = match std::env::var("RUST_LOG") {
        Ok(filter) if !filter.trim().is_empty() => filter,
        _ => build_filter_string(level),
    };

    let env_filter =
        EnvFilter::try_new(&filter_string).map_err(|e| LoggingError::InvalidFilter {
            filter: filter_string.clone(),
            reason: e.to_string(),
        })?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if json {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init()
    };

    result.map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_string_includes_quiet_defaults() {
        let filter = build_filter_string(LogLevel::Debug);
        assert!(filter.starts_with("debug,"));
        assert!(filter.contains("reqwest=warn"));
        assert!(EnvFilter::try_new(&filter).is_ok());
    }
}
