//! Core traits for cache operations

mod backend;
mod events;
mod fetcher;
mod metrics;
mod tracing;

pub use backend::CacheStorage;
pub use events::{EventBus, NoopBus};
pub use fetcher::Fetcher;
pub use metrics::{CacheMetrics, CacheOperation, EvictionReason, NoopMetrics};
pub use self::tracing::TracingMetrics;

#[cfg(feature = "metrics")]
pub use metrics::MetricsCrateAdapter;
