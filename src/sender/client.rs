use crate::app::CachePolicy;
use crate::reliability::AttemptId;
use bytes::Bytes;
use reqwest::header::{
    AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, HeaderMap, HeaderValue, PRAGMA,
};
use reqwest::{Client, ClientBuilder};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Errors raised while building the HTTP client. These are fatal at startup.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Outcome of a failed delivery. Handled by the retry state machine and never
/// surfaced to the producer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timeout")]
    Timeout,
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("HTTP error: {status}")]
    HttpStatus { status: u16 },
    #[error("Network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::ConnectionFailed(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

/// One POST worth of work: the serialized body and the attempt it belongs to.
/// Retries reuse the same value, so the body bytes are shared, not copied.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub attempt: AttemptId,
    pub body: Bytes,
    pub event_count: usize,
}

/// Sends one serialized batch. Implementations report completion through the
/// returned future; the dispatch queue runs it on its own task.
pub trait Transport: Send + Sync + 'static {
    fn deliver(
        &self,
        request: IngestRequest,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: Url,
    pub access_token: String,
    pub timeout: Duration,
    pub cache_policy: CachePolicy,
    pub allows_cellular_access: bool,
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(endpoint: Url, access_token: impl Into<String>) -> Self {
        Self {
            endpoint,
            access_token: access_token.into(),
            timeout: Duration::from_secs(10),
            cache_policy: CachePolicy::Protocol,
            allows_cellular_access: true,
            user_agent: format!("humio-shipper/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// `reqwest`-backed transport posting to the ingest endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: Arc<ClientConfig>,
    headers: HeaderMap,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        if config.access_token.is_empty() {
            return Err(ClientError::InvalidConfiguration(
                "Access token must not be empty".to_string(),
            ));
        }

        let headers = build_headers(&config)?;

        if !config.allows_cellular_access {
            debug!("Cellular access restriction has no effect on this platform");
        }

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            config: Arc::new(config),
            headers,
        })
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl Transport for HttpTransport {
    async fn deliver(&self, request: IngestRequest) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.config.endpoint.clone())
            .headers(self.headers.clone())
            .body(request.body)
            .send()
            .await?;

        // Response body is ignored; only the status matters.
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::HttpStatus {
                status: status.as_u16(),
            })
        }
    }
}

fn build_headers(config: &ClientConfig) -> Result<HeaderMap, ClientError> {
    let mut headers = HeaderMap::new();

    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.access_token))
        .map_err(|e| ClientError::InvalidConfiguration(format!("Invalid access token: {e}")))?;
    bearer.set_sensitive(true);
    headers.insert(AUTHORIZATION, bearer);

    if config.cache_policy == CachePolicy::Reload {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    }

    Ok(headers)
}
