//! Result of handling an intercepted request

use super::bucket::BucketKind;
use super::response::CachedResponse;

/// Where a handled response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseSource {
    /// Fresh from the network
    Network,
    /// Fresh cache hit
    Cache,
    /// Cached copy served while a revalidation runs
    Stale,
    /// Pre-warmed offline page
    Fallback,
    /// Nothing usable: explicit network error
    NetworkError,
}

/// Response produced by the router for one request
#[derive(Debug, Clone)]
pub struct HandledResponse {
    pub response: CachedResponse,
    pub source: ResponseSource,
    /// Bucket that governed the request
    pub bucket: BucketKind,
}

impl HandledResponse {
    pub fn new(response: CachedResponse, source: ResponseSource, bucket: BucketKind) -> Self {
        Self {
            response,
            source,
            bucket,
        }
    }

    /// Explicit network error for `bucket`
    pub fn network_error(bucket: BucketKind) -> Self {
        Self::new(
            CachedResponse::network_error(),
            ResponseSource::NetworkError,
            bucket,
        )
    }

    /// Served from storage (fresh, stale or fallback)
    pub fn is_from_cache(&self) -> bool {
        matches!(
            self.source,
            ResponseSource::Cache | ResponseSource::Stale | ResponseSource::Fallback
        )
    }

    pub fn is_network_error(&self) -> bool {
        matches!(self.source, ResponseSource::NetworkError)
    }
}
