//! Cache entry type

use std::time::{Duration, SystemTime};

use super::response::CachedResponse;

/// A stored response with its bookkeeping
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Normalized absolute URL the entry is addressed by
    pub url: String,
    /// The cached response
    pub response: CachedResponse,
    /// When the entry was written
    pub created_at: SystemTime,
    /// When the entry was last read
    pub last_accessed: SystemTime,
    /// Number of reads
    pub access_count: u64,
    /// Payload length in bytes
    pub size: u64,
}

impl CacheEntry {
    /// Create a new cache entry
    pub fn new(url: impl Into<String>, response: CachedResponse) -> Self {
        let now = SystemTime::now();
        let size = response.body.len() as u64;
        Self {
            url: url.into(),
            response,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            size,
        }
    }

    /// Get age of the entry
    pub fn age(&self) -> Duration {
        self.created_at.elapsed().unwrap_or_default()
    }

    /// Whether the entry is older than `max_age`
    pub fn is_older_than(&self, max_age: Duration) -> bool {
        self.age() > max_age
    }
}
