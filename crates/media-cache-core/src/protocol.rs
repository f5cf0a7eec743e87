//! Messages exchanged with observers
//!
//! Both directions are JSON objects tagged by `type`, e.g.
//! `{"type":"ABORT_PREFETCH","taskId":"prefetch-1"}`.

use serde::{Deserialize, Serialize};

use crate::types::{CacheSummary, PrefetchReport};

/// Observer -> worker intents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Broadcast a fresh inventory snapshot
    RequestCacheSummary,
    /// Start a prefetch task
    ///
    /// A `taskId` that is still running starts nothing; the worker answers
    /// with that task's current `PREFETCH_VIDEOS_UPDATE` instead.
    #[serde(rename_all = "camelCase")]
    PrefetchVideos {
        #[serde(default)]
        task_id: Option<String>,
        urls: Vec<String>,
        #[serde(default)]
        label: String,
    },
    /// Cancel a running task
    #[serde(rename_all = "camelCase")]
    AbortPrefetch { task_id: String },
    /// Wipe the media bucket
    ClearMediaCache,
    /// Wipe a named bucket (media when omitted)
    #[serde(rename_all = "camelCase")]
    ClearCache {
        #[serde(default, alias = "cacheName")]
        bucket_name: Option<String>,
    },
    /// Cache a single URL into the media bucket
    CacheVideo { url: String },
}

impl ClientMessage {
    /// Decode from JSON text
    pub fn from_json(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Worker -> observers events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerEvent {
    PrefetchVideosUpdate(PrefetchReport),
    CacheSummary(CacheSummary),
    #[serde(rename_all = "camelCase")]
    CacheCleared { bucket_name: String, cleared_at: u64 },
    CacheVersion { version: String },
    /// A `static` entry was revalidated against the network
    #[serde(rename_all = "camelCase")]
    CacheUpdated {
        bucket_name: String,
        url: String,
        changed: bool,
        updated_at: u64,
    },
}

impl WorkerEvent {
    /// Encode as JSON text
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Wire tag of this event
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerEvent::PrefetchVideosUpdate(_) => "PREFETCH_VIDEOS_UPDATE",
            WorkerEvent::CacheSummary(_) => "CACHE_SUMMARY",
            WorkerEvent::CacheCleared { .. } => "CACHE_CLEARED",
            WorkerEvent::CacheVersion { .. } => "CACHE_VERSION",
            WorkerEvent::CacheUpdated { .. } => "CACHE_UPDATED",
        }
    }
}
