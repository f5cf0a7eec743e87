//! Install and activation phases

use media_cache_core::{BucketKind, CacheError, FetchRequest, Result, WorkerEvent};

use crate::context::CacheContext;
use crate::expiration::store;

/// Outcome of pre-warming the fallback bucket
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Routes stored in the fallback bucket
    pub cached: Vec<String>,
    /// Routes that could not be fetched or stored
    pub skipped: Vec<String>,
}

/// Version lifecycle of the bucket set
#[derive(Clone)]
pub struct Lifecycle {
    ctx: CacheContext,
}

impl Lifecycle {
    pub fn new(ctx: CacheContext) -> Self {
        Self { ctx }
    }

    /// Pre-warm the fallback bucket with the always-available routes
    ///
    /// A route that fails is skipped; install itself never fails on it.
    pub async fn install(&self) -> Result<InstallReport> {
        let fallback = self.ctx.spec(BucketKind::Fallback);
        let mut report = InstallReport::default();

        for route in &self.ctx.config.precache_routes {
            let url = match self.ctx.config.resolve(route) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(target: "media_cache", route = %route, error = %e, "invalid pre-warm route");
                    report.skipped.push(route.clone());
                    continue;
                }
            };
            let key = url.as_str().to_string();

            let stored = match self.ctx.fetcher.fetch(&FetchRequest::get(url)).await {
                Ok(response) if response.status == 200 => {
                    store(&self.ctx, fallback, &key, response).await
                }
                Ok(response) => Err(CacheError::Status {
                    status: response.status,
                    url: key.clone(),
                }),
                Err(e) => Err(e),
            };

            match stored {
                Ok(()) => report.cached.push(key),
                Err(e) => {
                    tracing::warn!(target: "media_cache", url = %key, error = %e, "pre-warm failed, skipping");
                    report.skipped.push(key);
                }
            }
        }

        tracing::info!(
            target: "media_cache",
            bucket = %fallback.name,
            cached = report.cached.len(),
            skipped = report.skipped.len(),
            "installed"
        );
        Ok(report)
    }

    /// Delete every owned bucket outside the current allow-list
    ///
    /// Publishes the active version afterwards and returns the deleted names.
    pub async fn activate(&self) -> Result<Vec<String>> {
        let registry = &self.ctx.registry;
        let mut deleted = Vec::new();

        for name in self.ctx.storage.bucket_names().await? {
            if registry.is_owned(&name)
                && !registry.is_current(&name)
                && self.ctx.storage.delete_bucket(&name).await?
            {
                deleted.push(name);
            }
        }

        tracing::info!(
            target: "media_cache",
            version = registry.version(),
            retired = deleted.len(),
            "activated"
        );
        self.ctx.publish(WorkerEvent::CacheVersion {
            version: registry.version().to_string(),
        });
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context_with, observed_context, ScriptedFetcher};
    use media_cache_core::{CacheStorage, CachedResponse};
    use media_cache_storage::MemoryStorage;

    #[tokio::test]
    async fn test_install_prewarms_and_skips_failures() {
        let storage = MemoryStorage::with_defaults();
        let fetcher = ScriptedFetcher::new();
        fetcher.ok("https://host/", "home");
        fetcher.ok("https://host/offline/", "offline");
        fetcher.status("https://host/cache-management/", 503);

        let lifecycle = Lifecycle::new(context_with(storage.clone(), fetcher));
        let report = lifecycle.install().await.unwrap();

        assert_eq!(report.cached, vec!["https://host/", "https://host/offline/"]);
        assert_eq!(report.skipped, vec!["https://host/cache-management/"]);
        assert_eq!(storage.len("app-fallback-v1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_activate_retires_old_versions() {
        let storage = MemoryStorage::with_defaults();
        for bucket in ["app-media-v0", "app-static-v0", "app-media-v1", "thirdparty-v0"] {
            storage
                .put(bucket, "https://host/x", CachedResponse::ok("x"))
                .await
                .unwrap();
        }

        let (ctx, mut events) = observed_context(storage.clone(), ScriptedFetcher::new());
        let deleted = Lifecycle::new(ctx).activate().await.unwrap();

        assert_eq!(deleted, vec!["app-media-v0", "app-static-v0"]);
        let remaining = storage.bucket_names().await.unwrap();
        assert_eq!(remaining, vec!["app-media-v1", "thirdparty-v0"]);
        assert_eq!(
            events.recv().await.unwrap(),
            WorkerEvent::CacheVersion {
                version: "v1".into()
            }
        );
    }
}
