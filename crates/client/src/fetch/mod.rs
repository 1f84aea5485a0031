//! Upstream network access for the worker.
//!
//! ### Network seam
//! - Strategies only see the [`Network`] trait, so tests drive them with a
//!   scripted implementation and hosts plug in [`FetchClient`].
//! - A resolved response is `Ok` whatever its status; only transport
//!   failures (DNS, refused connection, timeout, oversize body) are `Err`.
//!
//! ### Safety limits
//! - Request timeout (default: 20s)
//! - Max redirects: 5
//! - Max body bytes: 10MB (configurable)

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, header};
use reqwest::Client;
use std::time::{Duration, Instant};

pub use self::url::{UrlError, resolve, same_origin};

use rinkorea_core::{AppConfig, Error, StoredResponse, WorkerRequest};

/// Headers that describe a single connection and are never forwarded or
/// stored.
static HOP_BY_HOP: [header::HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Source of upstream responses.
#[async_trait]
pub trait Network: Send + Sync {
    /// Issue the request upstream.
    ///
    /// # Errors
    ///
    /// Returns a network error (`Error::is_network`) when no response could
    /// be obtained.
    async fn fetch(&self, request: &WorkerRequest) -> Result<StoredResponse, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "rinkorea-sw/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "rinkorea-sw/0.1".to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// reqwest-backed [`Network`] implementation.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }
}

/// Copy request headers that may be forwarded upstream.
///
/// `Host` is derived from the URL and `Accept-Encoding` is negotiated by the
/// client itself so bodies are stored decoded.
fn forwardable(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if *name == header::HOST || *name == header::ACCEPT_ENCODING || *name == header::CONTENT_LENGTH {
            continue;
        }
        if HOP_BY_HOP.contains(name) {
            continue;
        }
        forwarded.append(name.clone(), value.clone());
    }

    if !forwarded.contains_key(header::ACCEPT) {
        forwarded.insert(header::ACCEPT, header::HeaderValue::from_static(DEFAULT_ACCEPT));
    }

    forwarded
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
}

impl FetchClient {
    /// Forward a request the worker does not intercept, body included.
    pub async fn forward(&self, request: &WorkerRequest, body: Bytes) -> Result<StoredResponse, Error> {
        self.send(request, Some(body)).await
    }

    async fn send(&self, request: &WorkerRequest, body: Option<Bytes>) -> Result<StoredResponse, Error> {
        let start = Instant::now();

        let mut builder = self
            .http
            .request(request.method.clone(), request.url.as_str())
            .headers(forwardable(&request.headers));
        if let Some(body) = body.filter(|b| !b.is_empty()) {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::FetchTimeout(format!("{} after {:?}", request.url, self.config.timeout))
                } else {
                    Error::HttpError(format!("network error: {}", e))
                }
            })?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let mut headers = response.headers().clone();
        strip_hop_by_hop(&mut headers);

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchTimeout(format!("{} body after {:?}", request.url, self.config.timeout))
            } else {
                Error::HttpError(format!("failed to read response: {}", e))
            }
        })?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(StoredResponse::new(status, headers, bytes))
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &WorkerRequest) -> Result<StoredResponse, Error> {
        self.send(request, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "rinkorea-sw/0.1");
        assert_eq!(config.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "test-agent".into(), timeout_ms: 1500, max_bytes: 1024, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.max_bytes, 1024);
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_forwardable_drops_connection_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("127.0.0.1:8787"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip, br, zstd"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer token"));

        let forwarded = forwardable(&headers);
        assert!(!forwarded.contains_key(header::HOST));
        assert!(!forwarded.contains_key(header::CONNECTION));
        assert!(!forwarded.contains_key(header::ACCEPT_ENCODING));
        assert_eq!(forwarded.get(header::AUTHORIZATION).unwrap(), "Bearer token");
        assert_eq!(forwarded.get(header::ACCEPT).unwrap(), DEFAULT_ACCEPT);
    }

    #[test]
    fn test_forwardable_keeps_explicit_accept() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let forwarded = forwardable(&headers);
        assert_eq!(forwarded.get(header::ACCEPT).unwrap(), "application/json");
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/css"));
        strip_hop_by_hop(&mut headers);
        assert!(!headers.contains_key(header::TRANSFER_ENCODING));
        assert!(headers.contains_key(header::CONTENT_TYPE));
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }
}
