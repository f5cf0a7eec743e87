//! Metrics trait for cache observability

use std::time::Duration;

use crate::BucketKind;

/// Operation for latency tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOperation {
    /// Network fetch issued by a strategy or task
    Fetch,
    /// Bucket lookup
    Match,
    /// Bucket write
    Put,
    /// Inventory snapshot
    Summary,
}

impl CacheOperation {
    /// Get operation as string label
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOperation::Fetch => "fetch",
            CacheOperation::Match => "match",
            CacheOperation::Put => "put",
            CacheOperation::Summary => "summary",
        }
    }
}

/// Reason for cache eviction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvictionReason {
    /// Older than the bucket's max age
    Expired,
    /// Bucket over its entry cap
    Capacity,
    /// Freed to make room after a quota error
    Quota,
}

impl EvictionReason {
    /// Get reason as string label
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionReason::Expired => "expired",
            EvictionReason::Capacity => "capacity",
            EvictionReason::Quota => "quota",
        }
    }
}

/// Trait for cache metrics/observability
///
/// Implement this to integrate with your metrics system (Prometheus, StatsD, etc.)
pub trait CacheMetrics: Send + Sync + 'static {
    /// Record a fresh cache hit
    fn record_hit(&self, bucket: BucketKind, url: &str);

    /// Record a cache miss
    fn record_miss(&self, bucket: BucketKind, url: &str);

    /// Record a cached copy served while revalidating
    fn record_stale_hit(&self, bucket: BucketKind, url: &str);

    /// Record the offline fallback page being served
    fn record_fallback(&self, url: &str);

    /// Record operation latency
    fn record_latency(&self, operation: CacheOperation, duration: Duration);

    /// Record evictions
    fn record_eviction(&self, bucket: BucketKind, reason: EvictionReason, count: usize);
}

/// No-op metrics implementation (default)
///
/// Zero overhead when metrics are not needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl CacheMetrics for NoopMetrics {
    #[inline]
    fn record_hit(&self, _bucket: BucketKind, _url: &str) {}

    #[inline]
    fn record_miss(&self, _bucket: BucketKind, _url: &str) {}

    #[inline]
    fn record_stale_hit(&self, _bucket: BucketKind, _url: &str) {}

    #[inline]
    fn record_fallback(&self, _url: &str) {}

    #[inline]
    fn record_latency(&self, _operation: CacheOperation, _duration: Duration) {}

    #[inline]
    fn record_eviction(&self, _bucket: BucketKind, _reason: EvictionReason, _count: usize) {}
}

/// Metrics adapter using the `metrics` crate
///
/// # Example
/// ```ignore
/// use media_cache_core::MetricsCrateAdapter;
///
/// let metrics = MetricsCrateAdapter::new("media_cache");
/// // Emits: media_cache_hits_total{bucket="media"}, media_cache_evictions_total, etc.
/// ```
#[cfg(feature = "metrics")]
#[derive(Debug, Clone)]
pub struct MetricsCrateAdapter {
    prefix: String,
}

#[cfg(feature = "metrics")]
impl MetricsCrateAdapter {
    /// Create a new adapter with the given metric name prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn metric_name(&self, name: &str) -> String {
        format!("{}_{}", self.prefix, name)
    }
}

#[cfg(feature = "metrics")]
impl CacheMetrics for MetricsCrateAdapter {
    fn record_hit(&self, bucket: BucketKind, _url: &str) {
        metrics::counter!(self.metric_name("hits_total"), "bucket" => bucket.as_str()).increment(1);
    }

    fn record_miss(&self, bucket: BucketKind, _url: &str) {
        metrics::counter!(self.metric_name("misses_total"), "bucket" => bucket.as_str())
            .increment(1);
    }

    fn record_stale_hit(&self, bucket: BucketKind, _url: &str) {
        metrics::counter!(self.metric_name("stale_hits_total"), "bucket" => bucket.as_str())
            .increment(1);
    }

    fn record_fallback(&self, _url: &str) {
        metrics::counter!(self.metric_name("fallbacks_total")).increment(1);
    }

    fn record_latency(&self, operation: CacheOperation, duration: Duration) {
        metrics::histogram!(
            self.metric_name("operation_duration_seconds"),
            "operation" => operation.as_str()
        )
        .record(duration.as_secs_f64());
    }

    fn record_eviction(&self, bucket: BucketKind, reason: EvictionReason, count: usize) {
        metrics::counter!(
            self.metric_name("evictions_total"),
            "bucket" => bucket.as_str(),
            "reason" => reason.as_str()
        )
        .increment(count as u64);
    }
}
