use super::cli::parse_tag;
use super::{Config, ConfigError, FlushMode};

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Credentials are the only hard requirement
        self.access_token()?;
        self.dataspace()?;

        // Validate endpoint URL
        let url = self.ingest_url()?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "Ingest URL must use http or https: {url}"
            )));
        }

        // Validate timeouts
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        // Validate flush triggers
        if matches!(self.flush_mode, FlushMode::Timer | FlushMode::Both)
            && self.flush_interval_ms == 0
        {
            return Err(ConfigError::InvalidConfig(
                "Flush interval must be greater than 0".to_string(),
            ));
        }
        if matches!(self.flush_mode, FlushMode::Threshold | FlushMode::Both) && self.bulk_size == 0
        {
            return Err(ConfigError::InvalidConfig(
                "Bulk size must be greater than 0".to_string(),
            ));
        }

        for tag in &self.tags {
            parse_tag(tag)?;
        }

        Ok(())
    }
}
