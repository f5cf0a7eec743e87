//! Bucket declarations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Purpose of a storage bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketKind {
    /// Navigations (full page loads)
    Pages,
    /// Scripts, styles, workers and the default route
    Static,
    /// JSON/data endpoints
    Data,
    /// Images
    Images,
    /// Audio and video
    Media,
    /// Pre-warmed offline routes
    Fallback,
}

impl BucketKind {
    /// Every kind, in declaration order
    pub const ALL: [BucketKind; 6] = [
        BucketKind::Pages,
        BucketKind::Static,
        BucketKind::Data,
        BucketKind::Images,
        BucketKind::Media,
        BucketKind::Fallback,
    ];

    /// Get kind as string label
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketKind::Pages => "pages",
            BucketKind::Static => "static",
            BucketKind::Data => "data",
            BucketKind::Images => "images",
            BucketKind::Media => "media",
            BucketKind::Fallback => "fallback",
        }
    }
}

impl fmt::Display for BucketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Freshness policy applied when satisfying a request from a bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    NetworkFirst,
    StaleWhileRevalidate,
    CacheFirst,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::NetworkFirst => "network-first",
            StrategyKind::StaleWhileRevalidate => "stale-while-revalidate",
            StrategyKind::CacheFirst => "cache-first",
        }
    }
}

/// Expiration rules for a bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpirationPolicy {
    /// Maximum number of entries (oldest evicted first)
    pub max_entries: Option<usize>,
    /// Maximum age of an entry
    pub max_age: Option<Duration>,
    /// Evict oldest entries when a write hits the storage quota
    pub purge_on_quota_error: bool,
}

impl ExpirationPolicy {
    /// No expiration at all
    pub fn none() -> Self {
        Self::default()
    }

    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    pub fn max_age(mut self, age: Duration) -> Self {
        self.max_age = Some(age);
        self
    }

    pub fn max_age_days(self, days: u64) -> Self {
        self.max_age(Duration::from_secs(days * 24 * 60 * 60))
    }

    pub fn purge_on_quota_error(mut self) -> Self {
        self.purge_on_quota_error = true;
        self
    }

    /// Whether the policy ever removes anything on its own
    pub fn is_unbounded(&self) -> bool {
        self.max_entries.is_none() && self.max_age.is_none()
    }
}

/// A named, versioned storage container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSpec {
    /// Stable identity: `<prefix>-<kind>-<version>`
    pub name: String,
    pub kind: BucketKind,
    pub strategy: StrategyKind,
    pub expiration: ExpirationPolicy,
}

impl BucketSpec {
    /// Build the versioned name for a kind
    pub fn versioned_name(prefix: &str, kind: BucketKind, version: &str) -> String {
        format!("{}-{}-{}", prefix, kind.as_str(), version)
    }
}
