//! # HTTP Retrieval Utilities
//!
//! A thin asynchronous client around `reqwest` with a fixed per-request
//! timeout. Non-2xx statuses are *not* errors at this layer: they come back as
//! an [`ApiResponse`] with `success == false` so the caller can tell a 429 from
//! a 503. Only failures that produced no HTTP status at all become a
//! [`TransportError`].

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// A standardized container for API responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// The numeric HTTP status code.
    pub status: u16,
    /// Indicates if the status code was in the 2xx range.
    pub success: bool,
    /// The raw response body.
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            success: (200..300).contains(&status),
            body: body.into(),
        }
    }
}

/// Failures that happen before an HTTP status is available.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Building the underlying client failed (TLS backend, invalid settings).
    #[error("Failed to build HTTP client: {0}")]
    Build(String),

    /// The request did not complete within the configured timeout.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// DNS, TCP or TLS level failure, or a connection reset.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The response body could not be read.
    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Request failed: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        // Strip the URL: it carries the credentials in its query string.
        let err = err.without_url();
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

/// One GET round trip. Implemented by [`ApiClient`] for real traffic and by
/// scripted fakes in tests.
pub trait HttpTransport {
    fn get(&self, url: &Url) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;
}

/// A `reqwest` client configured with a request timeout and JSON accept headers.
#[derive(Debug, Clone)]
pub struct ApiClient {
    inner: reqwest::Client,
}

impl ApiClient {
    /// Creates a client whose every request is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("roadwatch/", env!("CARGO_PKG_VERSION"))),
        );

        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        Ok(Self { inner })
    }
}

impl HttpTransport for ApiClient {
    async fn get(&self, url: &Url) -> Result<ApiResponse, TransportError> {
        debug!(host = url.host_str().unwrap_or_default(), path = url.path(), "GET");

        let response: reqwest::Response = self.inner.get(url.clone()).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(ApiResponse::new(status, body))
    }
}
