//! HTTP fetch seam between the caching strategies and the network.
//!
//! Strategies never talk to reqwest directly; they go through the
//! [`Fetcher`] trait so tests can substitute a counting mock. The real
//! implementation preserves status, headers, and body unmodified - a
//! non-success status is still a response, and only transport failures
//! surface as errors.

pub mod url;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method, Url};

pub use url::{UrlError, normalize};

use swcache_core::{Error, StoredResponse};

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "sw-worker/0.1")
    pub user_agent: String,

    /// Request timeout; None leaves requests to the transport's own
    /// behavior (default: None)
    pub timeout: Option<Duration>,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "sw-worker/0.1".to_string(), timeout: None, max_redirects: 5 }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    /// The URL requested
    pub url: Url,
    /// HTTP status code
    pub status: u16,
    /// Response headers, in wire order
    pub headers: Vec<(String, String)>,
    /// Response body bytes
    pub body: Bytes,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchedResponse {
    /// Whether the status code indicates success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Convert into the representation the cache store holds.
    pub fn into_stored(self) -> StoredResponse {
        StoredResponse { status: self.status, headers: self.headers, body: self.body.to_vec() }
    }
}

/// Network access seam for the strategy executors.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a URL.
    ///
    /// Returns Ok for any response the server produced, including
    /// non-success statuses; Err only for transport-level failures.
    async fn fetch(&self, method: &str, url: &Url) -> Result<FetchedResponse, Error>;
}

/// Reqwest-backed fetcher.
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, method: &str, url: &Url) -> Result<FetchedResponse, Error> {
        let start = Instant::now();

        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid method: {method}")))?;

        let response = self
            .http
            .request(method, url.clone())
            .send()
            .await
            .map_err(|e| Error::Network(format!("{url}: {e}")))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("{url}: failed to read body: {e}")))?;

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(%url, status, fetch_ms, bytes = body.len(), "fetched");

        Ok(FetchedResponse { url: url.clone(), status, headers, body, fetch_ms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "sw-worker/0.1");
        assert_eq!(config.timeout, None);
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_http_fetcher_new() {
        let fetcher = HttpFetcher::new(FetchConfig::default());
        assert!(fetcher.is_ok());
    }

    #[test]
    fn test_fetched_response_into_stored() {
        let response = FetchedResponse {
            url: Url::parse("https://example.com/").unwrap(),
            status: 200,
            headers: vec![("content-type".into(), "text/css".into())],
            body: Bytes::from_static(b"body{}"),
            fetch_ms: 12,
        };

        assert!(response.is_success());
        let stored = response.into_stored();
        assert_eq!(stored.status, 200);
        assert_eq!(stored.header("content-type"), Some("text/css"));
        assert_eq!(stored.body, b"body{}");
    }

    #[test]
    fn test_non_success_is_still_a_response() {
        let response = FetchedResponse {
            url: Url::parse("https://example.com/missing").unwrap(),
            status: 404,
            headers: Vec::new(),
            body: Bytes::new(),
            fetch_ms: 3,
        };
        assert!(!response.is_success());
    }
}
