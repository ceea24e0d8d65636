use super::{CachePolicy, ConfigError, FlushMode, LogLevel};
use crate::buffer::Tags;
use crate::dispatch::{DispatchSettings, FlushPolicy};
use crate::reliability::RetryConfig;
use crate::sender::ClientConfig;
use crate::sink::LOGGER_NAME;
use clap::{ArgAction, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://cloud.humio.com";

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Full ingest URL (overrides the one derived from base URL and dataspace)
    #[arg(long, env = "HUMIO_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Base URL of the Humio installation
    #[arg(long, env = "HUMIO_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Ingest access token
    #[arg(long, env = "HUMIO_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Dataspace the events are ingested into
    #[arg(long, env = "HUMIO_DATASPACE")]
    pub dataspace: Option<String>,

    /// Logger identifier attached to every event (random if not set)
    #[arg(long, env = "HUMIO_LOGGER_ID")]
    pub logger_id: Option<String>,

    /// Application name, sent as the `application` tag
    #[arg(long, env = "HUMIO_APPLICATION")]
    pub application: Option<String>,

    /// Application version, sent as the `appVersion` attribute
    #[arg(long, env = "HUMIO_APP_VERSION")]
    pub app_version: Option<String>,

    /// Build number, sent as the `buildVersion` attribute
    #[arg(long, env = "HUMIO_BUILD_VERSION")]
    pub build_version: Option<String>,

    /// Extra batch tags as key=value (repeatable or comma separated)
    #[arg(long = "tag", env = "HUMIO_TAGS", value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Cache policy for ingest requests
    #[arg(long, env = "HUMIO_CACHE_POLICY", default_value = "protocol")]
    pub cache_policy: CachePolicy,

    /// Request timeout in milliseconds
    #[arg(long, env = "HUMIO_REQUEST_TIMEOUT_MS", default_value = "10000")]
    pub request_timeout_ms: u64,

    /// Which flush triggers are active
    #[arg(long, env = "HUMIO_FLUSH_MODE", default_value = "timer")]
    pub flush_mode: FlushMode,

    /// Flush interval in milliseconds
    #[arg(long, env = "HUMIO_FLUSH_INTERVAL_MS", default_value = "10000")]
    pub flush_interval_ms: u64,

    /// Number of buffered events that triggers a send
    #[arg(long, env = "HUMIO_BULK_SIZE", default_value = "1")]
    pub bulk_size: usize,

    /// Resubmissions allowed after a failed send
    #[arg(long, env = "HUMIO_RETRY_LIMIT", default_value = "2")]
    pub retry_limit: u32,

    /// Delay before resubmitting a failed send, in milliseconds
    #[arg(long, env = "HUMIO_RETRY_DELAY_MS", default_value = "5000")]
    pub retry_delay_ms: u64,

    /// Allow sending over metered (cellular) interfaces
    #[arg(
        long,
        env = "HUMIO_ALLOWS_CELLULAR_ACCESS",
        default_value = "true",
        action = ArgAction::Set
    )]
    pub allows_cellular_access: bool,

    /// Strip backslashes from message text
    #[arg(long, env = "HUMIO_OMIT_ESCAPE_CHARACTERS")]
    pub omit_escape_characters: bool,

    /// Report every request, response and retry
    #[arg(long, env = "HUMIO_VERBOSE")]
    pub verbose: bool,

    /// Longest wait for in-flight deliveries on shutdown, in milliseconds
    #[arg(long, env = "HUMIO_SHUTDOWN_TIMEOUT_MS", default_value = "4000")]
    pub shutdown_timeout_ms: u64,

    /// Log level of the shipper's own diagnostics
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Emit the shipper's own diagnostics as JSON
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,

    /// Configuration file path (optional)
    #[arg(long, env = "HUMIO_CONFIG_FILE")]
    #[serde(skip)]
    pub config_file: Option<PathBuf>,

    /// Derived fields (not CLI arguments)
    #[serde(skip)]
    #[arg(skip)]
    pub flush_interval: Duration,

    #[serde(skip)]
    #[arg(skip)]
    pub request_timeout: Duration,

    #[serde(skip)]
    #[arg(skip)]
    pub retry_delay: Duration,

    #[serde(skip)]
    #[arg(skip)]
    pub shutdown_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token: None,
            dataspace: None,
            logger_id: None,
            application: None,
            app_version: None,
            build_version: None,
            tags: Vec::new(),
            cache_policy: CachePolicy::Protocol,
            request_timeout_ms: 10_000,
            flush_mode: FlushMode::Timer,
            flush_interval_ms: 10_000,
            bulk_size: 1,
            retry_limit: 2,
            retry_delay_ms: 5_000,
            allows_cellular_access: true,
            omit_escape_characters: false,
            verbose: false,
            shutdown_timeout_ms: 4_000,
            log_level: LogLevel::Info,
            log_json: false,
            config_file: None,
            flush_interval: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
            retry_delay: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(4),
        }
    }
}

impl Config {
    /// Config with credentials set and every other option at its default.
    pub fn new(access_token: impl Into<String>, dataspace: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            dataspace: Some(dataspace.into()),
            ..Self::default()
        }
    }

    /// Parses CLI arguments (and their env fallbacks). When `--config-file`
    /// is given, the file replaces everything else.
    pub fn from_args_and_env<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Config::try_parse_from(args)?;
        config.resolve()
    }

    /// Loads the referenced config file if any, then derives and validates.
    pub fn resolve(mut self) -> Result<Self, ConfigError> {
        if let Some(path) = self.config_file.take() {
            return Self::from_file(path);
        }
        self.post_process()?;
        self.validate()?;
        Ok(self)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content)?;
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn post_process(&mut self) -> Result<(), ConfigError> {
        // Convert milliseconds to Duration
        self.flush_interval = Duration::from_millis(self.flush_interval_ms);
        self.request_timeout = Duration::from_millis(self.request_timeout_ms);
        self.retry_delay = Duration::from_millis(self.retry_delay_ms);
        self.shutdown_timeout = Duration::from_millis(self.shutdown_timeout_ms);
        Ok(())
    }

    pub fn access_token(&self) -> Result<&str, ConfigError> {
        self.access_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ConfigError::MissingAccessToken)
    }

    pub fn dataspace(&self) -> Result<&str, ConfigError> {
        self.dataspace
            .as_deref()
            .map(str::trim)
            .filter(|space| !space.is_empty())
            .ok_or(ConfigError::MissingDataspace)
    }

    /// `<base-url>/api/v1/dataspaces/<dataspace>/ingest` unless overridden.
    pub fn ingest_url(&self) -> Result<Url, ConfigError> {
        if let Some(endpoint) = &self.endpoint {
            return Url::parse(endpoint).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid endpoint URL '{endpoint}': {e}"))
            });
        }

        let dataspace = self.dataspace()?;
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid base URL '{}': {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                ConfigError::InvalidUrl(format!("Base URL '{}' cannot have a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(["api", "v1", "dataspaces", dataspace, "ingest"]);
        Ok(url)
    }

    /// Default tags overlaid with the configured ones.
    pub fn tag_map(&self) -> Result<Tags, ConfigError> {
        let mut tags = Tags::from([
            ("platform".to_string(), std::env::consts::OS.to_string()),
            ("source".to_string(), LOGGER_NAME.to_string()),
        ]);
        if let Some(application) = &self.application {
            tags.insert("application".to_string(), application.clone());
        }

        for tag in &self.tags {
            let (key, value) = parse_tag(tag)?;
            tags.insert(key.to_string(), value.to_string());
        }
        Ok(tags)
    }

    pub fn flush_policy(&self) -> FlushPolicy {
        match self.flush_mode {
            FlushMode::Timer => FlushPolicy::timer(self.flush_interval),
            FlushMode::Threshold => FlushPolicy::threshold(self.bulk_size),
            FlushMode::Both => FlushPolicy::both(self.flush_interval, self.bulk_size),
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            retry_limit: self.retry_limit,
            retry_delay: self.retry_delay,
        }
    }

    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        let mut client = ClientConfig::new(self.ingest_url()?, self.access_token()?);
        client.timeout = self.request_timeout;
        client.cache_policy = self.cache_policy;
        client.allows_cellular_access = self.allows_cellular_access;
        Ok(client)
    }

    pub fn dispatch_settings(&self) -> Result<DispatchSettings, ConfigError> {
        Ok(DispatchSettings {
            tags: self.tag_map()?,
            policy: self.flush_policy(),
            retry: self.retry_config(),
        })
    }
}

pub(super) fn parse_tag(tag: &str) -> Result<(&str, &str), ConfigError> {
    match tag.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => Err(ConfigError::InvalidConfig(format!(
            "Tag '{tag}' must have the form key=value"
        ))),
    }
}
