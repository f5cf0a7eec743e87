//! `reqwest`-backed network access
//!
//! The client carries no cookie store, so every request goes out with
//! credentials omitted. Request headers (notably `Range`) are forwarded
//! as-is, and any upstream status is returned to the caller: deciding
//! what counts as success belongs to the strategy or task.

use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};

use media_cache_core::{CacheError, CachedResponse, FetchRequest, Fetcher};

use crate::response::from_parts;

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string
    pub user_agent: String,

    /// Whole-request timeout; `None` lets large media transfers run to completion
    pub timeout: Option<Duration>,

    /// Connect timeout
    pub connect_timeout: Duration,

    /// Maximum number of redirects to follow
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("media-cache/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: None,
            connect_timeout: Duration::from_secs(10),
            max_redirects: 5,
        }
    }
}

/// HTTP fetcher used by strategies and prefetch tasks.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, CacheError> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .gzip(true)
            .deflate(true);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| CacheError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http })
    }

    /// Fetcher with default configuration
    pub fn with_defaults() -> Result<Self, CacheError> {
        Self::new(FetchConfig::default())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<CachedResponse, CacheError> {
        let start = Instant::now();

        let mut builder = self.http.get(request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                CacheError::Timeout
            } else {
                CacheError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| CacheError::Network(format!("failed to read response: {}", e)))?;

        tracing::debug!(
            target: "media_cache",
            url = %request.url,
            status = status.as_u16(),
            bytes = body.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "fetched"
        );

        Ok(from_parts(status, &headers, body))
    }
}
