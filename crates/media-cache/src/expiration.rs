//! Age and capacity limits of buckets
//!
//! Limits are applied after every write through [`store`], and expired
//! entries are never served: [`fresh_entry`] drops them on read.

use std::time::Instant;

use media_cache_core::{
    BucketSpec, CacheEntry, CacheOperation, CachedResponse, EvictionReason, ExpirationPolicy,
    Result,
};

use crate::context::CacheContext;

/// Whether an entry is still within the policy's age limit
pub fn is_fresh(entry: &CacheEntry, policy: &ExpirationPolicy) -> bool {
    policy
        .max_age
        .is_none_or(|max_age| !entry.is_older_than(max_age))
}

/// Read an entry, dropping it if it outlived the bucket's age limit
///
/// Storage failures read as a miss.
pub async fn fresh_entry(ctx: &CacheContext, spec: &BucketSpec, key: &str) -> Option<CacheEntry> {
    let start = Instant::now();
    let found = ctx.storage.get(&spec.name, key).await;
    ctx.metrics.record_latency(CacheOperation::Match, start.elapsed());

    match found {
        Ok(Some(entry)) if is_fresh(&entry, &spec.expiration) => Some(entry),
        Ok(Some(_)) => {
            if let Ok(true) = ctx.storage.delete(&spec.name, key).await {
                ctx.metrics
                    .record_eviction(spec.kind, EvictionReason::Expired, 1);
            }
            None
        }
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(
                target: "media_cache",
                bucket = %spec.name,
                url = key,
                error = %e,
                "cache read failed"
            );
            None
        }
    }
}

/// Write a response and apply the bucket's limits
///
/// When the write exceeds the storage quota and the bucket allows it,
/// its oldest entries are evicted one at a time until the write fits.
pub async fn store(
    ctx: &CacheContext,
    spec: &BucketSpec,
    key: &str,
    response: CachedResponse,
) -> Result<()> {
    let start = Instant::now();
    let mut purged = 0usize;

    loop {
        match ctx.storage.put(&spec.name, key, response.clone()).await {
            Ok(()) => break,
            Err(e) if e.is_quota() && spec.expiration.purge_on_quota_error => {
                let victim = ctx
                    .storage
                    .keys(&spec.name)
                    .await?
                    .into_iter()
                    .find(|k| k != key);
                let Some(victim) = victim else {
                    return Err(e);
                };
                ctx.storage.delete(&spec.name, &victim).await?;
                purged += 1;
            }
            Err(e) => return Err(e),
        }
    }

    if purged > 0 {
        ctx.metrics
            .record_eviction(spec.kind, EvictionReason::Quota, purged);
        tracing::warn!(
            target: "media_cache",
            bucket = %spec.name,
            purged,
            "storage quota exceeded, oldest entries purged"
        );
    }
    ctx.metrics.record_latency(CacheOperation::Put, start.elapsed());

    enforce(ctx, spec).await?;
    Ok(())
}

/// Remove expired entries, then the oldest entries beyond the entry cap
///
/// Returns the number of removed entries.
pub async fn enforce(ctx: &CacheContext, spec: &BucketSpec) -> Result<usize> {
    let policy = spec.expiration;
    if policy.is_unbounded() {
        return Ok(0);
    }

    let keys = ctx.storage.keys(&spec.name).await?;
    let mut survivors = Vec::with_capacity(keys.len());
    let mut expired = 0usize;

    match policy.max_age {
        Some(max_age) => {
            for key in keys {
                match ctx.storage.get(&spec.name, &key).await? {
                    Some(entry) if entry.is_older_than(max_age) => {
                        if ctx.storage.delete(&spec.name, &key).await? {
                            expired += 1;
                        }
                    }
                    Some(_) => survivors.push(key),
                    None => {}
                }
            }
        }
        None => survivors = keys,
    }

    let mut evicted = 0usize;
    if let Some(max_entries) = policy.max_entries {
        let excess = survivors.len().saturating_sub(max_entries);
        for key in survivors.iter().take(excess) {
            if ctx.storage.delete(&spec.name, key).await? {
                evicted += 1;
            }
        }
    }

    if expired > 0 {
        ctx.metrics
            .record_eviction(spec.kind, EvictionReason::Expired, expired);
    }
    if evicted > 0 {
        ctx.metrics
            .record_eviction(spec.kind, EvictionReason::Capacity, evicted);
    }
    if expired + evicted > 0 {
        tracing::debug!(
            target: "media_cache",
            bucket = %spec.name,
            expired,
            evicted,
            "expiration applied"
        );
    }

    Ok(expired + evicted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context_with, ScriptedFetcher};
    use media_cache_core::{BucketKind, CacheStorage};
    use media_cache_storage::{MemoryConfig, MemoryStorage};
    use std::time::{Duration, SystemTime};

    fn url(i: usize) -> String {
        format!("https://host/img/{}.png", i)
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let storage = MemoryStorage::with_defaults();
        let ctx = context_with(storage.clone(), ScriptedFetcher::new());
        let spec = ctx.spec(BucketKind::Data).clone();

        for i in 0..52 {
            store(&ctx, &spec, &url(i), CachedResponse::ok("{}")).await.unwrap();
        }

        let keys = storage.keys(&spec.name).await.unwrap();
        assert_eq!(keys.len(), 50);
        assert_eq!(keys[0], url(2));
    }

    #[tokio::test]
    async fn test_expired_entries_removed_and_not_served() {
        let storage = MemoryStorage::with_defaults();
        let ctx = context_with(storage.clone(), ScriptedFetcher::new());
        let spec = ctx.spec(BucketKind::Data).clone();

        store(&ctx, &spec, &url(0), CachedResponse::ok("old")).await.unwrap();
        let long_ago = SystemTime::now() - Duration::from_secs(600);
        assert!(storage.backdate(&spec.name, &url(0), long_ago));

        assert!(fresh_entry(&ctx, &spec, &url(0)).await.is_none());
        assert_eq!(storage.len(&spec.name).await.unwrap(), 0);

        store(&ctx, &spec, &url(1), CachedResponse::ok("a")).await.unwrap();
        storage.backdate(&spec.name, &url(1), long_ago);
        store(&ctx, &spec, &url(2), CachedResponse::ok("b")).await.unwrap();
        assert_eq!(storage.keys(&spec.name).await.unwrap(), vec![url(2)]);
    }

    #[tokio::test]
    async fn test_media_purges_on_quota() {
        let storage = MemoryStorage::new(MemoryConfig::with_quota(10));
        let ctx = context_with(storage.clone(), ScriptedFetcher::new());
        let spec = ctx.spec(BucketKind::Media).clone();

        store(&ctx, &spec, "https://host/a.mp4", CachedResponse::ok("aaaa")).await.unwrap();
        store(&ctx, &spec, "https://host/b.mp4", CachedResponse::ok("bbbb")).await.unwrap();
        store(&ctx, &spec, "https://host/c.mp4", CachedResponse::ok("cccccc")).await.unwrap();

        let keys = storage.keys(&spec.name).await.unwrap();
        assert_eq!(keys, vec!["https://host/b.mp4", "https://host/c.mp4"]);
    }

    #[tokio::test]
    async fn test_media_too_large_for_quota() {
        let storage = MemoryStorage::new(MemoryConfig::with_quota(4));
        let ctx = context_with(storage.clone(), ScriptedFetcher::new());
        let spec = ctx.spec(BucketKind::Media).clone();

        let err = store(&ctx, &spec, "https://host/a.mp4", CachedResponse::ok("too large"))
            .await
            .unwrap_err();
        assert!(err.is_quota());
    }

    #[tokio::test]
    async fn test_other_buckets_do_not_purge() {
        let storage = MemoryStorage::new(MemoryConfig::with_quota(6));
        let ctx = context_with(storage.clone(), ScriptedFetcher::new());
        let spec = ctx.spec(BucketKind::Images).clone();

        store(&ctx, &spec, &url(0), CachedResponse::ok("aaaa")).await.unwrap();
        let err = store(&ctx, &spec, &url(1), CachedResponse::ok("bbbb"))
            .await
            .unwrap_err();
        assert!(err.is_quota());
        assert_eq!(storage.len(&spec.name).await.unwrap(), 1);
    }
}
