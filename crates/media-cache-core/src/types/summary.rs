//! Inventory snapshot

use serde::{Deserialize, Serialize};

use super::bucket::BucketKind;

/// Per-bucket projection within a summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSummaryEntry {
    pub bucket_name: String,
    pub kind: BucketKind,
    pub entry_count: usize,
    /// Only computed for the media bucket
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    pub sample_urls: Vec<String>,
}

/// Storage usage as reported by the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEstimate {
    /// Bytes currently stored across all buckets
    pub usage: u64,
    /// Configured quota, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<u64>,
}

impl StorageEstimate {
    /// Usage as a fraction of the quota (0.0 to 1.0)
    pub fn usage_ratio(&self) -> Option<f64> {
        match self.quota {
            Some(0) | None => None,
            Some(quota) => Some((self.usage as f64 / quota as f64).min(1.0)),
        }
    }
}

/// Snapshot broadcast as `CACHE_SUMMARY`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSummary {
    /// Milliseconds since the Unix epoch
    pub generated_at: u64,
    pub caches: Vec<CacheSummaryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageEstimate>,
}

impl CacheSummary {
    /// Entry for a given kind
    pub fn bucket(&self, kind: BucketKind) -> Option<&CacheSummaryEntry> {
        self.caches.iter().find(|c| c.kind == kind)
    }

    /// Sum of entry counts over all buckets
    pub fn total_entries(&self) -> usize {
        self.caches.iter().map(|c| c.entry_count).sum()
    }
}

/// Render a byte count with 1024-based units
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}
