//! Network seam

use async_trait::async_trait;
use crate::{CachedResponse, CacheError, FetchRequest};

/// Issues network requests on behalf of the engine
///
/// Any HTTP status is a successful fetch; only transport failures are
/// errors. Callers decide which statuses they accept.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    async fn fetch(&self, request: &FetchRequest) -> Result<CachedResponse, CacheError>;
}
