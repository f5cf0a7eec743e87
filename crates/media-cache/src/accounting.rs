//! Storage footprint of cached responses

use media_cache_core::{CacheStorage, CachedResponse};

/// Size of a stored response
///
/// Prefers the declared `content-length`; otherwise measures the body.
pub fn measure(response: &CachedResponse) -> u64 {
    response
        .content_length()
        .unwrap_or(response.body.len() as u64)
}

/// Size of one stored entry
///
/// Reads without counting an access. A missing entry or a storage failure
/// counts as zero bytes.
pub async fn entry_bytes(storage: &dyn CacheStorage, bucket: &str, key: &str) -> u64 {
    match storage.peek(bucket, key).await {
        Ok(Some(entry)) => measure(&entry.response),
        Ok(None) => 0,
        Err(e) => {
            tracing::warn!(
                target: "media_cache",
                bucket,
                url = key,
                error = %e,
                "size lookup failed, counting 0 bytes"
            );
            0
        }
    }
}

/// Total size of the given keys, read one entry at a time
pub async fn total_bytes(storage: &dyn CacheStorage, bucket: &str, keys: &[String]) -> u64 {
    let mut total = 0u64;
    for key in keys {
        total = total.saturating_add(entry_bytes(storage, bucket, key).await);
    }
    total
}
