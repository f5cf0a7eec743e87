//! Core types for cache operations

mod bucket;
mod entry;
mod outcome;
mod request;
mod response;
mod summary;
mod task;

pub use bucket::{BucketKind, BucketSpec, ExpirationPolicy, StrategyKind};
pub use entry::CacheEntry;
pub use outcome::{HandledResponse, ResponseSource};
pub use request::{Credentials, Destination, FetchRequest, RequestMode};
pub use response::CachedResponse;
pub use summary::{format_bytes, CacheSummary, CacheSummaryEntry, StorageEstimate};
pub use task::{PrefetchReport, PrefetchStatus, UrlFailure};

/// Milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
