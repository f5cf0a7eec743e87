//! Per-bucket inventory snapshots

use std::time::Instant;

use media_cache_core::{
    format_bytes, now_millis, BucketKind, CacheOperation, CacheSummary, CacheSummaryEntry,
    Result, WorkerEvent,
};

use crate::accounting;
use crate::context::CacheContext;

/// Computes and broadcasts [`CacheSummary`] snapshots
///
/// Counts are read from storage on every call.
#[derive(Clone)]
pub struct InventoryService {
    ctx: CacheContext,
}

impl InventoryService {
    pub fn new(ctx: CacheContext) -> Self {
        Self { ctx }
    }

    /// Snapshot every declared bucket
    ///
    /// Only the media bucket carries `total_bytes`.
    pub async fn compute_summary(&self) -> Result<CacheSummary> {
        let start = Instant::now();
        let sample_size = self.ctx.config.sample_size;
        let mut caches = Vec::with_capacity(self.ctx.registry.specs().len());

        for spec in self.ctx.registry.specs() {
            let keys = self.ctx.storage.keys(&spec.name).await?;
            let total_bytes = if spec.kind == BucketKind::Media {
                Some(accounting::total_bytes(self.ctx.storage.as_ref(), &spec.name, &keys).await)
            } else {
                None
            };

            caches.push(CacheSummaryEntry {
                bucket_name: spec.name.clone(),
                kind: spec.kind,
                entry_count: keys.len(),
                total_bytes,
                sample_urls: keys.into_iter().take(sample_size).collect(),
            });
        }

        let storage = match self.ctx.storage.estimate().await {
            Ok(estimate) => Some(estimate),
            Err(e) => {
                tracing::warn!(target: "media_cache", error = %e, "storage estimate unavailable");
                None
            }
        };

        let summary = CacheSummary {
            generated_at: now_millis(),
            caches,
            storage,
        };

        self.ctx
            .metrics
            .record_latency(CacheOperation::Summary, start.elapsed());
        tracing::debug!(
            target: "media_cache",
            entries = summary.total_entries(),
            media = %format_bytes(
                summary
                    .bucket(BucketKind::Media)
                    .and_then(|b| b.total_bytes)
                    .unwrap_or(0)
            ),
            "summary computed"
        );

        Ok(summary)
    }

    /// Compute a snapshot and send it to every observer
    pub async fn broadcast_summary(&self) -> Result<CacheSummary> {
        let summary = self.compute_summary().await?;
        self.ctx.publish(WorkerEvent::CacheSummary(summary.clone()));
        Ok(summary)
    }
}
