//! Worker configuration

use std::time::Duration;
use url::Url;

use media_cache_core::Result;

/// Configuration for a [`MediaWorker`](crate::MediaWorker)
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Base URL every relative URL is resolved against
    pub scope: Url,
    /// Identity prefix shared by every bucket this application owns
    pub app_prefix: String,
    /// Version suffix of the current bucket set
    pub version: String,
    /// Network timeout for navigations before falling back to cache
    pub navigation_timeout: Duration,
    /// Network timeout for JSON/data endpoints
    pub data_timeout: Duration,
    /// Number of keys listed per bucket in a summary
    pub sample_size: usize,
    /// Buffered events per observer before it starts lagging
    pub event_capacity: usize,
    /// Routes pre-warmed into the fallback bucket on install
    pub precache_routes: Vec<String>,
    /// Page served to navigations that fail with nothing cached
    pub offline_route: String,
    /// Host suffixes whose responses are always treated as media
    pub media_hosts: Vec<String>,
}

impl WorkerConfig {
    /// Create a config for the given scope with default settings
    pub fn new(scope: Url) -> Self {
        Self {
            scope,
            app_prefix: "media-cache".to_string(),
            version: "v1".to_string(),
            navigation_timeout: Duration::from_secs(8),
            data_timeout: Duration::from_secs(6),
            sample_size: 5,
            event_capacity: 256,
            precache_routes: vec![
                "/".to_string(),
                "/offline/".to_string(),
                "/cache-management/".to_string(),
            ],
            offline_route: "/offline/".to_string(),
            media_hosts: vec![
                "r2.dev".to_string(),
                "digitaloceanspaces.com".to_string(),
            ],
        }
    }

    /// Parse the scope and create a default config
    pub fn from_scope(scope: &str) -> Result<Self> {
        Ok(Self::new(Url::parse(scope)?))
    }

    /// Set the bucket identity prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.app_prefix = prefix.into();
        self
    }

    /// Set the bucket version suffix
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn with_data_timeout(mut self, timeout: Duration) -> Self {
        self.data_timeout = timeout;
        self
    }

    pub fn with_sample_size(mut self, size: usize) -> Self {
        self.sample_size = size;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Replace the pre-warmed route list
    pub fn with_precache_routes<I, S>(mut self, routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.precache_routes = routes.into_iter().map(Into::into).collect();
        self
    }

    /// Add a host suffix treated as media
    pub fn with_media_host(mut self, host: impl Into<String>) -> Self {
        self.media_hosts.push(host.into());
        self
    }

    /// Resolve a (possibly relative) URL against the scope
    ///
    /// The fragment is dropped, so `a.mp4#t=10` and `a.mp4` are one URL.
    pub fn resolve(&self, raw: &str) -> Result<Url> {
        let mut url = self.scope.join(raw.trim())?;
        url.set_fragment(None);
        Ok(url)
    }
}
