use async_trait::async_trait;
use hyper::ext::ReasonPhrase;
use reqwest::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, ClientBuilder, StatusCode};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::timeout;
use tracing::debug;
use url::Url;

#[cfg(test)]
use mockall::automock;

pub const DEFAULT_BASE_URL: &str = "https://checkpoint-api.hashicorp.com/v1/";
pub const DEFAULT_USER_AGENT: &str = "HashiCorp/cdktf-cli";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Status codes the checkpoint service answers with on success.
pub const ACCEPTED_STATUS_CODES: [u16; 2] = [200, 201];

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Request timeout after {0:?}")]
    RequestTimeout(Duration),
    #[error("HTTP error: {status} - {message}")]
    UnexpectedStatus { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Outcome of an accepted delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub status: u16,
    pub latency: Duration,
    pub bytes_sent: usize,
}

/// One-shot delivery of a serialized report.
///
/// Implementations make exactly one attempt and never retry.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, product: &str, body: Vec<u8>) -> Result<Delivery, TransportError>;
}

/// Transport posting reports to the checkpoint HTTP API.
#[derive(Debug, Clone)]
pub struct CheckpointClient {
    client: Client,
    config: ClientConfig,
    base_url: Url,
}

impl CheckpointClient {
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        let base_url: Url = config.base_url.parse().map_err(|e| {
            TransportError::InvalidConfiguration(format!("Invalid base URL: {}", e))
        })?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(TransportError::InvalidConfiguration(format!(
                "Unsupported URL scheme: {}",
                base_url.scheme()
            )));
        }

        let client = ClientBuilder::new()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| {
                TransportError::InvalidConfiguration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `<base>/telemetry/<product>`, with `product` kept to one path segment.
    pub fn telemetry_url(&self, product: &str) -> Result<Url, TransportError> {
        if matches!(product, "" | "." | "..") {
            return Err(TransportError::InvalidConfiguration(format!(
                "Invalid product: {product:?}"
            )));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                TransportError::InvalidConfiguration(format!(
                    "Base URL cannot carry a path: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push("telemetry")
            .push(product);

        Ok(url)
    }

    pub fn build_headers(&self, content_length: usize) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(content_length));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.config.user_agent).map_err(|e| {
                TransportError::InvalidConfiguration(format!("Invalid user agent: {}", e))
            })?,
        );

        Ok(headers)
    }
}

#[async_trait]
impl Transport for CheckpointClient {
    async fn deliver(&self, product: &str, body: Vec<u8>) -> Result<Delivery, TransportError> {
        let url = self.telemetry_url(product)?;
        let bytes_sent = body.len();
        let headers = self.build_headers(bytes_sent)?;
        let start = Instant::now();

        let exchange = async {
            let response = self
                .client
                .post(url.clone())
                .headers(headers)
                .body(body)
                .send()
                .await?;
            let status = response.status();
            let reason = response
                .extensions()
                .get::<ReasonPhrase>()
                .and_then(|reason| std::str::from_utf8(reason.as_bytes()).ok())
                .map(str::to_string);
            // Drained, never parsed
            response.bytes().await?;
            Ok::<_, reqwest::Error>((status, reason))
        };

        // Dropping the exchange on timeout tears down the in-flight connection
        let (status, reason) = timeout(self.config.timeout, exchange)
            .await
            .map_err(|_| TransportError::RequestTimeout(self.config.timeout))??;
        let latency = start.elapsed();

        debug!(
            url = %url,
            status = status.as_u16(),
            latency_ms = latency.as_millis() as u64,
            "checkpoint request completed"
        );

        if !ACCEPTED_STATUS_CODES.contains(&status.as_u16()) {
            return Err(TransportError::UnexpectedStatus {
                status: status.as_u16(),
                message: status_message(status, reason.as_deref()),
            });
        }

        Ok(Delivery {
            status: status.as_u16(),
            latency,
            bytes_sent,
        })
    }
}

/// The reason phrase the server sent, else the standard one for the code.
fn status_message(status: StatusCode, reason: Option<&str>) -> String {
    reason
        .or_else(|| status.canonical_reason())
        .unwrap_or("Unknown Status")
        .to_string()
}
