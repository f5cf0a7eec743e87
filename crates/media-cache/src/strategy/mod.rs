//! Strategy execution for intercepted requests

use std::time::{Duration, Instant};

use media_cache_core::{
    now_millis, BucketKind, CacheError, CacheOperation, CachedResponse, FetchRequest,
    HandledResponse, ResponseSource, Result, StrategyKind, WorkerEvent,
};
use media_cache_http::{serve_range, CacheableStatuses};

use crate::context::CacheContext;
use crate::expiration::{fresh_entry, store};
use crate::router::{Route, StrategyRouter};

mod coalescer;
use coalescer::Coalescer;

/// Headers compared to decide whether a revalidated asset changed
const UPDATE_HEADERS: [&str; 3] = ["content-length", "etag", "last-modified"];

/// Routes requests and runs the matching strategy
///
/// Every request produces a response: a network failure with nothing
/// usable in storage yields an explicit network error.
#[derive(Clone)]
pub struct StrategyExecutor {
    ctx: CacheContext,
    router: StrategyRouter,
    coalescer: Coalescer,
}

impl StrategyExecutor {
    pub fn new(ctx: CacheContext) -> Self {
        Self {
            router: StrategyRouter::new(&ctx.config),
            ctx,
            coalescer: Coalescer::new(),
        }
    }

    pub fn router(&self) -> &StrategyRouter {
        &self.router
    }

    /// Route a request and satisfy it
    pub async fn handle(&self, request: FetchRequest) -> HandledResponse {
        let route = self.router.route(&request);
        match route.strategy {
            StrategyKind::NetworkFirst => self.network_first(request, route).await,
            StrategyKind::StaleWhileRevalidate => {
                self.stale_while_revalidate(request, route).await
            }
            StrategyKind::CacheFirst => self.cache_first(request, route).await,
        }
    }

    async fn network_first(&self, request: FetchRequest, route: Route) -> HandledResponse {
        let spec = self.ctx.spec(route.bucket);
        let key = request.cache_key();

        match self.fetch_within(&request, route.network_timeout).await {
            Ok(response) => {
                if CacheableStatuses::ok_only().allows(response.status) {
                    self.write(route.bucket, &key, response.clone()).await;
                }
                return HandledResponse::new(response, ResponseSource::Network, route.bucket);
            }
            Err(e) => {
                tracing::debug!(
                    target: "media_cache",
                    url = %key,
                    bucket = %spec.name,
                    error = %e,
                    "network failed, falling back to cache"
                );
            }
        }

        if let Some(entry) = fresh_entry(&self.ctx, spec, &key).await {
            self.ctx.metrics.record_hit(route.bucket, &key);
            return HandledResponse::new(entry.response, ResponseSource::Cache, route.bucket);
        }
        self.ctx.metrics.record_miss(route.bucket, &key);

        if route.uses_offline_fallback() {
            if let Some(response) = self.offline_page(&key).await {
                self.ctx.metrics.record_fallback(&key);
                return HandledResponse::new(response, ResponseSource::Fallback, route.bucket);
            }
        }

        HandledResponse::network_error(route.bucket)
    }

    async fn stale_while_revalidate(&self, request: FetchRequest, route: Route) -> HandledResponse {
        let spec = self.ctx.spec(route.bucket);
        let key = request.cache_key();

        if let Some(entry) = fresh_entry(&self.ctx, spec, &key).await {
            self.ctx.metrics.record_stale_hit(route.bucket, &key);

            let ctx = self.ctx.clone();
            let previous = entry.response.clone();
            let notify = route.broadcasts_updates();
            self.coalescer.try_spawn_refresh(&key, move || {
                revalidate(ctx, request, route.bucket, previous, notify)
            });

            return HandledResponse::new(entry.response, ResponseSource::Stale, route.bucket);
        }
        self.ctx.metrics.record_miss(route.bucket, &key);

        match self.fetch_and_store(&request, route).await {
            Ok(response) => HandledResponse::new(response, ResponseSource::Network, route.bucket),
            Err(e) => {
                tracing::debug!(target: "media_cache", url = %key, error = %e, "fetch failed");
                HandledResponse::network_error(route.bucket)
            }
        }
    }

    async fn cache_first(&self, request: FetchRequest, route: Route) -> HandledResponse {
        let spec = self.ctx.spec(route.bucket);
        let key = request.cache_key();
        let range = request.range().filter(|_| route.serves_ranges());

        if let Some(entry) = fresh_entry(&self.ctx, spec, &key).await {
            self.ctx.metrics.record_hit(route.bucket, &key);
            let response = match range {
                Some(header) => serve_range(&entry.response, header),
                None => entry.response,
            };
            return HandledResponse::new(response, ResponseSource::Cache, route.bucket);
        }
        self.ctx.metrics.record_miss(route.bucket, &key);

        match self.fetch_and_store(&request, route).await {
            Ok(response) => {
                // Upstream ignored the range and sent the whole body
                let response = match range {
                    Some(header) if response.status == 200 => serve_range(&response, header),
                    _ => response,
                };
                HandledResponse::new(response, ResponseSource::Network, route.bucket)
            }
            Err(e) => {
                tracing::debug!(target: "media_cache", url = %key, error = %e, "fetch failed");
                HandledResponse::network_error(route.bucket)
            }
        }
    }

    /// Fetch once per key and range, writing cacheable responses
    async fn fetch_and_store(&self, request: &FetchRequest, route: Route) -> Result<CachedResponse> {
        let coalesce_key = match request.range() {
            Some(range) => format!("{}|{}", request.cache_key(), range),
            None => request.cache_key(),
        };

        let this = self.clone();
        let request = request.clone();
        self.coalescer
            .do_request(&coalesce_key, move || async move {
                let response = this.fetch_within(&request, None).await?;
                if is_cacheable(&route, &request, &response) {
                    this.write(route.bucket, &request.cache_key(), response.clone())
                        .await;
                }
                Ok(response)
            })
            .await
    }

    async fn fetch_within(
        &self,
        request: &FetchRequest,
        timeout: Option<Duration>,
    ) -> Result<CachedResponse> {
        let start = Instant::now();
        let fetch = self.ctx.fetcher.fetch(request);
        let result = match timeout {
            Some(limit) => tokio::time::timeout(limit, fetch)
                .await
                .unwrap_or(Err(CacheError::Timeout)),
            None => fetch.await,
        };
        self.ctx
            .metrics
            .record_latency(CacheOperation::Fetch, start.elapsed());
        result
    }

    /// Write through to a bucket; failures only cost the cached copy
    async fn write(&self, kind: BucketKind, key: &str, response: CachedResponse) {
        let spec = self.ctx.spec(kind);
        if let Err(e) = store(&self.ctx, spec, key, response).await {
            if e.is_quota() {
                tracing::warn!(
                    target: "media_cache",
                    bucket = %spec.name,
                    url = key,
                    error = %e,
                    "storage quota exceeded, response not cached"
                );
            } else {
                tracing::warn!(
                    target: "media_cache",
                    bucket = %spec.name,
                    url = key,
                    error = %e,
                    "cache write failed"
                );
            }
        }
    }

    /// The pre-warmed copy of this page, else the offline page
    async fn offline_page(&self, key: &str) -> Option<CachedResponse> {
        let fallback = self.ctx.spec(BucketKind::Fallback);
        if let Some(entry) = fresh_entry(&self.ctx, fallback, key).await {
            return Some(entry.response);
        }
        let offline = self.ctx.config.resolve(&self.ctx.config.offline_route).ok()?;
        fresh_entry(&self.ctx, fallback, offline.as_str())
            .await
            .map(|entry| entry.response)
    }
}

fn is_cacheable(route: &Route, request: &FetchRequest, response: &CachedResponse) -> bool {
    if route.bucket != BucketKind::Media {
        return CacheableStatuses::ok_only().allows(response.status);
    }
    // A partial body answering our own range cannot stand in for the whole file
    if response.status == 206 && request.range().is_some() {
        return false;
    }
    CacheableStatuses::media().allows(response.status)
}

/// Refresh a cached copy in the background
async fn revalidate(
    ctx: CacheContext,
    request: FetchRequest,
    kind: BucketKind,
    previous: CachedResponse,
    notify: bool,
) {
    let spec = ctx.spec(kind);
    let key = request.cache_key();

    let response = match ctx.fetcher.fetch(&request).await {
        Ok(response) if CacheableStatuses::ok_only().allows(response.status) => response,
        Ok(response) => {
            tracing::debug!(
                target: "media_cache",
                url = %key,
                status = response.status,
                "revalidation not cacheable, keeping cached copy"
            );
            return;
        }
        Err(e) => {
            tracing::debug!(target: "media_cache", url = %key, error = %e, "revalidation failed");
            return;
        }
    };

    let changed = has_changed(&previous, &response);
    if let Err(e) = store(&ctx, spec, &key, response).await {
        tracing::warn!(
            target: "media_cache",
            bucket = %spec.name,
            url = %key,
            error = %e,
            "revalidated response not cached"
        );
        return;
    }

    tracing::debug!(target: "media_cache", url = %key, changed, "revalidated");
    if notify {
        ctx.publish(WorkerEvent::CacheUpdated {
            bucket_name: spec.name.clone(),
            url: key,
            changed,
            updated_at: now_millis(),
        });
    }
}

/// Compare identifying headers, or the bodies when neither side has any
fn has_changed(previous: &CachedResponse, current: &CachedResponse) -> bool {
    let has_any = |r: &CachedResponse| UPDATE_HEADERS.iter().any(|h| r.get_header(h).is_some());
    if !has_any(previous) && !has_any(current) {
        return previous.body != current.body;
    }
    UPDATE_HEADERS
        .iter()
        .any(|h| previous.get_header(h) != current.get_header(h))
}
