use crate::{BucketKind, CacheMetrics, CacheOperation, EvictionReason};
use std::time::Duration;
use tracing::debug;

/// Metrics adapter that logs events via `tracing`
#[derive(Debug, Clone, Default)]
pub struct TracingMetrics {
    /// Service name/prefix (optional)
    service_name: Option<String>,
}

impl TracingMetrics {
    /// Create new tracing metrics adapter
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with service name prefix
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }
}

impl CacheMetrics for TracingMetrics {
    fn record_hit(&self, bucket: BucketKind, url: &str) {
        debug!(
            target: "media_cache",
            event = "hit",
            bucket = %bucket,
            url = %url,
            service = ?self.service_name,
            "Cache Hit"
        );
    }

    fn record_miss(&self, bucket: BucketKind, url: &str) {
        debug!(
            target: "media_cache",
            event = "miss",
            bucket = %bucket,
            url = %url,
            service = ?self.service_name,
            "Cache Miss"
        );
    }

    fn record_stale_hit(&self, bucket: BucketKind, url: &str) {
        debug!(
            target: "media_cache",
            event = "stale_hit",
            bucket = %bucket,
            url = %url,
            service = ?self.service_name,
            "Cache Stale Hit"
        );
    }

    fn record_fallback(&self, url: &str) {
        debug!(
            target: "media_cache",
            event = "fallback",
            url = %url,
            service = ?self.service_name,
            "Offline Fallback"
        );
    }

    fn record_latency(&self, operation: CacheOperation, duration: Duration) {
        tracing::trace!(
            target: "media_cache",
            event = "latency",
            operation = operation.as_str(),
            duration_ms = duration.as_millis(),
            service = ?self.service_name,
            "Cache Operation Latency"
        );
    }

    fn record_eviction(&self, bucket: BucketKind, reason: EvictionReason, count: usize) {
        debug!(
            target: "media_cache",
            event = "eviction",
            bucket = %bucket,
            reason = reason.as_str(),
            count = count,
            service = ?self.service_name,
            "Cache Eviction"
        );
    }
}
