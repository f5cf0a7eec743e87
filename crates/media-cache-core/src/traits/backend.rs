//! Bucket storage trait

use async_trait::async_trait;
use crate::{CacheEntry, CachedResponse, CacheError, StorageEstimate};

/// Core trait for bucket storage backends
///
/// A backend holds any number of named buckets. Buckets are created on
/// first write; reads against a missing bucket behave like an empty one.
/// Keys are normalized absolute URLs.
#[async_trait]
pub trait CacheStorage: Send + Sync + 'static {
    /// Names of every bucket currently in storage
    async fn bucket_names(&self) -> Result<Vec<String>, CacheError>;

    /// Check if a bucket exists
    async fn has_bucket(&self, bucket: &str) -> Result<bool, CacheError>;

    /// Delete a whole bucket
    ///
    /// Returns `true` if the bucket existed.
    async fn delete_bucket(&self, bucket: &str) -> Result<bool, CacheError>;

    /// Keys of a bucket, oldest write first
    async fn keys(&self, bucket: &str) -> Result<Vec<String>, CacheError>;

    /// Get an entry, counting the read
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// Get an entry without touching its read bookkeeping
    async fn peek(&self, bucket: &str, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// Store a response, replacing any previous entry for the key
    ///
    /// Fails with [`CacheError::QuotaExceeded`] when the write does not fit.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        response: CachedResponse,
    ) -> Result<(), CacheError>;

    /// Delete an entry
    ///
    /// Returns `true` if the key existed and was deleted.
    async fn delete(&self, bucket: &str, key: &str) -> Result<bool, CacheError>;

    /// Number of entries in a bucket
    async fn len(&self, bucket: &str) -> Result<usize, CacheError> {
        Ok(self.keys(bucket).await?.len())
    }

    /// Current usage and quota
    async fn estimate(&self) -> Result<StorageEstimate, CacheError>;
}
