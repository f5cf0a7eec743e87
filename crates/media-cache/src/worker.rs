//! Message and fetch entry points

use std::sync::Arc;

use media_cache_core::{
    CacheError, CacheMetrics, CacheStorage, ClientMessage, EventBus, FetchRequest, Fetcher,
    HandledResponse, Result,
};
use media_cache_http::HttpFetcher;
#[cfg(feature = "memory")]
use media_cache_storage::MemoryStorage;

use crate::bus::{BroadcastBus, EventSubscriber};
use crate::config::WorkerConfig;
use crate::context::CacheContext;
use crate::inventory::InventoryService;
use crate::lifecycle::{InstallReport, Lifecycle};
use crate::prefetch::{PrefetchManager, TaskRegistry};
use crate::strategy::StrategyExecutor;

/// The engine behind one message channel
///
/// Intercepted requests go through [`handle_fetch`](Self::handle_fetch);
/// observer intents go through [`handle_message`](Self::handle_message),
/// which never fails: problems are logged and observers learn about
/// outcomes from the event stream.
#[derive(Clone)]
pub struct MediaWorker {
    ctx: CacheContext,
    strategies: StrategyExecutor,
    prefetch: PrefetchManager,
    inventory: InventoryService,
    lifecycle: Lifecycle,
    events: Option<BroadcastBus>,
}

impl MediaWorker {
    pub fn new(ctx: CacheContext) -> Self {
        Self::with_tasks(ctx, TaskRegistry::new())
    }

    /// Create a worker over an existing task registry
    pub fn with_tasks(ctx: CacheContext, tasks: TaskRegistry) -> Self {
        Self {
            strategies: StrategyExecutor::new(ctx.clone()),
            prefetch: PrefetchManager::new(ctx.clone(), tasks),
            inventory: InventoryService::new(ctx.clone()),
            lifecycle: Lifecycle::new(ctx.clone()),
            ctx,
            events: None,
        }
    }

    pub fn builder(config: WorkerConfig) -> MediaWorkerBuilder {
        MediaWorkerBuilder::new(config)
    }

    pub fn context(&self) -> &CacheContext {
        &self.ctx
    }

    pub fn prefetch(&self) -> &PrefetchManager {
        &self.prefetch
    }

    pub fn inventory(&self) -> &InventoryService {
        &self.inventory
    }

    pub fn strategies(&self) -> &StrategyExecutor {
        &self.strategies
    }

    /// Subscribe to events, when the worker owns its bus
    pub fn subscribe(&self) -> Option<EventSubscriber> {
        self.events.as_ref().map(BroadcastBus::subscribe)
    }

    /// Satisfy an intercepted request
    pub async fn handle_fetch(&self, request: FetchRequest) -> HandledResponse {
        self.strategies.handle(request).await
    }

    /// Dispatch an observer intent
    pub async fn handle_message(&self, message: ClientMessage) {
        let result = match message {
            ClientMessage::RequestCacheSummary => {
                self.inventory.broadcast_summary().await.map(|_| ())
            }
            ClientMessage::PrefetchVideos {
                task_id,
                urls,
                label,
            } => match self.prefetch.start_task(urls, label, task_id) {
                // The sender still hears about the task it asked for
                Err(CacheError::DuplicateTask(id)) => {
                    self.prefetch.republish(&id);
                    Err(CacheError::DuplicateTask(id))
                }
                other => other.map(|_| ()),
            },
            ClientMessage::AbortPrefetch { task_id } => {
                self.prefetch.abort_task(&task_id).map(|_| ())
            }
            ClientMessage::ClearMediaCache => self.prefetch.clear_media().await.map(|_| ()),
            ClientMessage::ClearCache { bucket_name } => match bucket_name {
                Some(name) if !self.ctx.registry.is_owned(&name) => {
                    tracing::warn!(target: "media_cache", bucket = %name, "refusing to clear foreign bucket");
                    Ok(())
                }
                Some(name) => self.prefetch.clear_bucket(&name).await.map(|_| ()),
                None => self.prefetch.clear_media().await.map(|_| ()),
            },
            ClientMessage::CacheVideo { url } => self.prefetch.cache_single(&url).map(|_| ()),
        };

        if let Err(e) = result {
            tracing::warn!(target: "media_cache", error = %e, "message failed");
        }
    }

    /// Decode and dispatch a JSON message; malformed input is dropped
    pub async fn handle_json(&self, text: &str) {
        match ClientMessage::from_json(text) {
            Ok(message) => self.handle_message(message).await,
            Err(e) => {
                tracing::warn!(target: "media_cache", error = %e, "malformed message dropped");
            }
        }
    }

    /// Pre-warm the fallback bucket
    pub async fn install(&self) -> Result<InstallReport> {
        self.lifecycle.install().await
    }

    /// Retire buckets of previous versions
    pub async fn activate(&self) -> Result<Vec<String>> {
        self.lifecycle.activate().await
    }

    /// Cancel every running prefetch task at its next URL
    pub fn shutdown(&self) {
        self.prefetch.shutdown();
    }
}

/// Builder for [`MediaWorker`]
///
/// Unset collaborators default to `MemoryStorage` (with the `memory`
/// feature), [`HttpFetcher`] and a [`BroadcastBus`] sized by `event_capacity`.
pub struct MediaWorkerBuilder {
    config: WorkerConfig,
    storage: Option<Arc<dyn CacheStorage>>,
    fetcher: Option<Arc<dyn Fetcher>>,
    bus: Option<Arc<dyn EventBus>>,
    metrics: Option<Arc<dyn CacheMetrics>>,
    tasks: TaskRegistry,
}

impl MediaWorkerBuilder {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config,
            storage: None,
            fetcher: None,
            bus: None,
            metrics: None,
            tasks: TaskRegistry::new(),
        }
    }

    pub fn storage(mut self, storage: impl CacheStorage) -> Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    pub fn fetcher(mut self, fetcher: impl Fetcher) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    /// Publish to an external bus instead of an owned [`BroadcastBus`]
    pub fn bus(mut self, bus: impl EventBus) -> Self {
        self.bus = Some(Arc::new(bus));
        self
    }

    pub fn metrics(mut self, metrics: impl CacheMetrics) -> Self {
        self.metrics = Some(Arc::new(metrics));
        self
    }

    pub fn tasks(mut self, tasks: TaskRegistry) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn build(self) -> Result<MediaWorker> {
        let storage: Arc<dyn CacheStorage> = match self.storage {
            Some(storage) => storage,
            #[cfg(feature = "memory")]
            None => Arc::new(MemoryStorage::with_defaults()),
            #[cfg(not(feature = "memory"))]
            None => {
                return Err(CacheError::Internal(
                    "no storage backend configured".into(),
                ));
            }
        };
        let fetcher: Arc<dyn Fetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::with_defaults()?),
        };

        let mut owned = None;
        let bus: Arc<dyn EventBus> = match self.bus {
            Some(bus) => bus,
            None => {
                let (bus, _) = BroadcastBus::new(self.config.event_capacity);
                owned = Some(bus.clone());
                Arc::new(bus)
            }
        };

        let mut ctx = CacheContext::new(self.config, storage, fetcher, bus);
        if let Some(metrics) = self.metrics {
            ctx = ctx.with_metrics(metrics);
        }

        let mut worker = MediaWorker::with_tasks(ctx, self.tasks);
        worker.events = owned;
        Ok(worker)
    }
}
