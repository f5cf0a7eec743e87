//! In-memory bucket storage using DashMap

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use media_cache_core::{
    CacheEntry, CacheError, CacheStorage, CachedResponse, Result, StorageEstimate,
};

/// Configuration for the memory backend
#[derive(Debug, Clone, Default)]
pub struct MemoryConfig {
    /// Total bytes shared by all buckets (0 = unlimited)
    pub quota_bytes: u64,
}

impl MemoryConfig {
    /// Create config with a specific quota
    pub fn with_quota(quota_bytes: u64) -> Self {
        Self { quota_bytes }
    }

    /// Create config with unlimited storage
    pub fn unlimited() -> Self {
        Self::default()
    }
}

/// Entry plus its write sequence number
#[derive(Debug, Clone)]
struct Slot {
    seq: u64,
    entry: CacheEntry,
}

type Bucket = HashMap<String, Slot>;

/// In-memory bucket storage
///
/// Cloning creates a new handle to the SAME underlying store. The quota is
/// shared across every bucket; usage counts payload bytes.
#[derive(Clone)]
pub struct MemoryStorage {
    /// Bucket name -> entries
    buckets: Arc<DashMap<String, Bucket>>,
    /// Bytes in use; the lock also serializes quota decisions
    usage: Arc<Mutex<u64>>,
    /// Monotonic write counter for insertion order
    seq: Arc<AtomicU64>,
    config: MemoryConfig,
}

impl MemoryStorage {
    /// Create a new memory backend
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            buckets: Arc::new(DashMap::new()),
            usage: Arc::new(Mutex::new(0)),
            seq: Arc::new(AtomicU64::new(0)),
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults() -> Self {
        Self::new(MemoryConfig::default())
    }

    /// Bytes currently in use
    pub fn usage(&self) -> u64 {
        *self.usage.lock()
    }

    /// Rewrite an entry's write time (tests exercising age-based expiry)
    pub fn backdate(&self, bucket: &str, key: &str, created_at: SystemTime) -> bool {
        match self.buckets.get_mut(bucket) {
            Some(mut entries) => match entries.get_mut(key) {
                Some(slot) => {
                    slot.entry.created_at = created_at;
                    true
                }
                None => false,
            },
            None => false,
        }
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn bucket_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.buckets.iter().map(|b| b.key().clone()).collect();
        names.sort();
        Ok(names)
    }

    async fn has_bucket(&self, bucket: &str) -> Result<bool> {
        Ok(self.buckets.contains_key(bucket))
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<bool> {
        let mut usage = self.usage.lock();
        match self.buckets.remove(bucket) {
            Some((_, entries)) => {
                let freed: u64 = entries.values().map(|s| s.entry.size).sum();
                *usage = usage.saturating_sub(freed);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn keys(&self, bucket: &str) -> Result<Vec<String>> {
        let Some(entries) = self.buckets.get(bucket) else {
            return Ok(Vec::new());
        };
        let mut slots: Vec<(u64, String)> = entries
            .iter()
            .map(|(key, slot)| (slot.seq, key.clone()))
            .collect();
        slots.sort_unstable_by_key(|(seq, _)| *seq);
        Ok(slots.into_iter().map(|(_, key)| key).collect())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Option<CacheEntry>> {
        let Some(mut entries) = self.buckets.get_mut(bucket) else {
            return Ok(None);
        };
        match entries.get_mut(key) {
            Some(slot) => {
                slot.entry.last_accessed = SystemTime::now();
                slot.entry.access_count += 1;
                Ok(Some(slot.entry.clone()))
            }
            None => Ok(None),
        }
    }

    async fn peek(&self, bucket: &str, key: &str) -> Result<Option<CacheEntry>> {
        Ok(self
            .buckets
            .get(bucket)
            .and_then(|entries| entries.get(key).map(|slot| slot.entry.clone())))
    }

    async fn put(&self, bucket: &str, key: &str, response: CachedResponse) -> Result<()> {
        let entry = CacheEntry::new(key, response);
        let mut usage = self.usage.lock();

        let replaced = self
            .buckets
            .get(bucket)
            .and_then(|entries| entries.get(key).map(|s| s.entry.size))
            .unwrap_or(0);
        let retained = usage.saturating_sub(replaced);
        let projected = retained + entry.size;

        if self.config.quota_bytes > 0 && projected > self.config.quota_bytes {
            let available = self.config.quota_bytes.saturating_sub(retained);
            return Err(CacheError::QuotaExceeded {
                bucket: bucket.to_string(),
                requested: entry.size,
                available,
            });
        }

        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), Slot { seq, entry });
        *usage = projected;
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<bool> {
        let mut usage = self.usage.lock();
        let Some(mut entries) = self.buckets.get_mut(bucket) else {
            return Ok(false);
        };
        match entries.remove(key) {
            Some(slot) => {
                *usage = usage.saturating_sub(slot.entry.size);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn len(&self, bucket: &str) -> Result<usize> {
        Ok(self.buckets.get(bucket).map(|b| b.len()).unwrap_or(0))
    }

    async fn estimate(&self) -> Result<StorageEstimate> {
        Ok(StorageEstimate {
            usage: self.usage(),
            quota: (self.config.quota_bytes > 0).then_some(self.config.quota_bytes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const MEDIA: &str = "app-media-v1";

    #[tokio::test]
    async fn test_basic_put_get() {
        let storage = MemoryStorage::with_defaults();

        storage
            .put(MEDIA, "https://host/a.mp4", CachedResponse::ok("value1"))
            .await
            .unwrap();

        let entry = storage.get(MEDIA, "https://host/a.mp4").await.unwrap();
        let entry = entry.unwrap();
        assert_eq!(entry.response.body.as_ref(), b"value1");
        assert_eq!(entry.access_count, 1);
        assert!(storage.has_bucket(MEDIA).await.unwrap());
    }

    #[tokio::test]
    async fn test_peek_leaves_bookkeeping_alone() {
        let storage = MemoryStorage::with_defaults();
        storage.put(MEDIA, "a", CachedResponse::ok("x")).await.unwrap();
        let written = storage.peek(MEDIA, "a").await.unwrap().unwrap();

        let peeked = storage.peek(MEDIA, "a").await.unwrap().unwrap();
        assert_eq!(peeked.access_count, 0);
        assert_eq!(peeked.last_accessed, written.last_accessed);
        assert!(storage.peek(MEDIA, "missing").await.unwrap().is_none());
        assert!(storage.peek("nope", "a").await.unwrap().is_none());

        storage.get(MEDIA, "a").await.unwrap();
        assert_eq!(storage.peek(MEDIA, "a").await.unwrap().unwrap().access_count, 1);
    }

    #[tokio::test]
    async fn test_missing_bucket_reads_empty() {
        let storage = MemoryStorage::with_defaults();
        assert!(storage.get("nope", "k").await.unwrap().is_none());
        assert!(storage.keys("nope").await.unwrap().is_empty());
        assert_eq!(storage.len("nope").await.unwrap(), 0);
        assert!(!storage.has_bucket("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_keys_in_write_order() {
        let storage = MemoryStorage::with_defaults();
        for key in ["c", "a", "b"] {
            storage.put(MEDIA, key, CachedResponse::ok("x")).await.unwrap();
        }
        assert_eq!(storage.keys(MEDIA).await.unwrap(), vec!["c", "a", "b"]);

        // Rewriting moves the key to the back
        storage.put(MEDIA, "c", CachedResponse::ok("y")).await.unwrap();
        assert_eq!(storage.keys(MEDIA).await.unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_delete_and_delete_bucket() {
        let storage = MemoryStorage::with_defaults();
        storage.put(MEDIA, "a", CachedResponse::ok("1234")).await.unwrap();
        storage.put(MEDIA, "b", CachedResponse::ok("12")).await.unwrap();
        assert_eq!(storage.usage(), 6);

        assert!(storage.delete(MEDIA, "a").await.unwrap());
        assert!(!storage.delete(MEDIA, "a").await.unwrap());
        assert_eq!(storage.usage(), 2);

        assert!(storage.delete_bucket(MEDIA).await.unwrap());
        assert!(!storage.delete_bucket(MEDIA).await.unwrap());
        assert_eq!(storage.usage(), 0);
        assert!(storage.bucket_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quota_exceeded() {
        let storage = MemoryStorage::new(MemoryConfig::with_quota(10));
        storage.put(MEDIA, "a", CachedResponse::ok("123456")).await.unwrap();

        let err = storage
            .put("app-images-v1", "b", CachedResponse::ok("123456"))
            .await
            .unwrap_err();
        match err {
            CacheError::QuotaExceeded {
                bucket,
                requested,
                available,
            } => {
                assert_eq!(bucket, "app-images-v1");
                assert_eq!(requested, 6);
                assert_eq!(available, 4);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!storage.has_bucket("app-images-v1").await.unwrap());

        // Replacing an entry only needs room for the difference
        storage.put(MEDIA, "a", CachedResponse::ok("1234567890")).await.unwrap();
        assert_eq!(storage.usage(), 10);

        let est = storage.estimate().await.unwrap();
        assert_eq!(est.usage, 10);
        assert_eq!(est.quota, Some(10));
    }

    #[tokio::test]
    async fn test_backdate() {
        let storage = MemoryStorage::with_defaults();
        storage.put(MEDIA, "a", CachedResponse::ok("x")).await.unwrap();
        let old = SystemTime::now() - Duration::from_secs(3600);
        assert!(storage.backdate(MEDIA, "a", old));
        assert!(!storage.backdate(MEDIA, "missing", old));

        let entry = storage.get(MEDIA, "a").await.unwrap().unwrap();
        assert!(entry.is_older_than(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn test_clone_shares_store() {
        let storage = MemoryStorage::with_defaults();
        let handle = storage.clone();
        handle.put(MEDIA, "a", CachedResponse::ok("x")).await.unwrap();
        assert_eq!(storage.len(MEDIA).await.unwrap(), 1);
    }
}
