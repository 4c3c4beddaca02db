//! Outbound HTTP retrieval for fetchcache.
//!
//! The cache never talks to the network itself; it consumes the
//! [`FetchedResponse`] produced by a [`Fetcher`]. [`HttpFetcher`] is the
//! production implementation:
//! - Only `http` and `https` URLs are accepted, checked before any I/O
//! - Every request is bounded by a fixed timeout (30 seconds by default)
//! - No retries; a failure is reported once, with a message that tells
//!   timeouts, network failures and protocol errors apart

mod error;

pub use error::{FetchError, Result};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Client, Url};
use std::collections::BTreeMap;
use std::error::Error as _;
use std::time::Duration;
use tracing::{debug, instrument};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Content type reported when the origin sends none
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Settings for [`HttpFetcher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Whole-request timeout, body included
    pub timeout: Duration,
    /// `User-Agent` sent to origins
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("fetchcache/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// What the origin returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResponse {
    /// HTTP status code
    pub status_code: u16,
    /// Response headers (lowercase names)
    pub headers: BTreeMap<String, String>,
    /// Response body
    pub body: Vec<u8>,
    /// `Content-Type`, or [`DEFAULT_CONTENT_TYPE`]
    pub content_type: String,
}

impl FetchedResponse {
    /// Whether the status is 2xx (the only responses worth caching)
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Retrieves a URL from its origin
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url`
    async fn fetch(&self, url: &str) -> Result<FetchedResponse>;
}

/// Check that `raw` parses and uses an allowed scheme
///
/// # Errors
///
/// Returns [`FetchError::InvalidUrl`] or [`FetchError::UnsupportedScheme`]
pub fn validate_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| FetchError::invalid_url(raw, e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FetchError::UnsupportedScheme {
            url: raw.to_string(),
            scheme: other.to_string(),
        }),
    }
}

/// [`Fetcher`] backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Build a fetcher from `config`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed (TLS backend
    /// initialization failure)
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetchError::protocol("(client setup)", format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }

    fn classify(&self, url: &str, err: &reqwest::Error) -> FetchError {
        let message = describe(err);
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            }
        } else if err.is_connect() {
            FetchError::Network {
                url: url.to_string(),
                message,
            }
        } else {
            FetchError::protocol(url, message)
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<FetchedResponse> {
        let target = validate_url(url)?;

        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|e| self.classify(url, &e))?;

        let status_code = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let content_type = content_type_of(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| self.classify(url, &e))?
            .to_vec();

        debug!(status_code, bytes = body.len(), "Fetched from origin");
        Ok(FetchedResponse {
            status_code,
            headers,
            body,
            content_type,
        })
    }
}

/// Flatten headers into a map; non-UTF-8 values are dropped and repeated
/// names keep the last value
fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

fn content_type_of(headers: &HeaderMap) -> String {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| DEFAULT_CONTENT_TYPE.to_string(), str::to_string)
}

/// `reqwest` errors hide the interesting part in their source chain
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
