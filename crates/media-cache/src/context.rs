//! Collaborators shared by every engine component

use std::sync::Arc;

use media_cache_core::{
    BucketKind, BucketSpec, CacheMetrics, CacheStorage, EventBus, Fetcher, NoopMetrics,
    WorkerEvent,
};

use crate::config::WorkerConfig;
use crate::registry::CacheRegistry;

/// Storage, network, event bus, metrics and the bucket registry
///
/// Cloning is cheap and every clone talks to the same collaborators.
#[derive(Clone)]
pub struct CacheContext {
    pub(crate) storage: Arc<dyn CacheStorage>,
    pub(crate) fetcher: Arc<dyn Fetcher>,
    pub(crate) bus: Arc<dyn EventBus>,
    pub(crate) metrics: Arc<dyn CacheMetrics>,
    pub(crate) registry: Arc<CacheRegistry>,
    pub(crate) config: Arc<WorkerConfig>,
}

impl CacheContext {
    pub fn new(
        config: WorkerConfig,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            registry: Arc::new(CacheRegistry::from_config(&config)),
            config: Arc::new(config),
            storage,
            fetcher,
            bus,
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Replace the metrics sink
    pub fn with_metrics(mut self, metrics: Arc<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn registry(&self) -> &CacheRegistry {
        &self.registry
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub(crate) fn spec(&self, kind: BucketKind) -> &BucketSpec {
        self.registry.spec(kind)
    }

    pub(crate) fn publish(&self, event: WorkerEvent) {
        self.bus.publish(event);
    }
}
