//! Scripted collaborators for engine tests

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use media_cache_core::{CacheError, CachedResponse, FetchRequest, Fetcher, NoopBus};
use media_cache_storage::MemoryStorage;

use crate::bus::{BroadcastBus, EventSubscriber};
use crate::config::WorkerConfig;
use crate::context::CacheContext;

pub const SCOPE: &str = "https://host/";

enum Script {
    Respond(CachedResponse),
    Fail(CacheError),
}

/// Holds a fetch in flight until released
#[derive(Default)]
pub struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    /// Wait until the gated fetch has started
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the gated fetch finish
    pub fn release(&self) {
        self.release.notify_one();
    }

    /// Signal arrival, then wait for release
    pub async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

#[derive(Default)]
struct Inner {
    scripts: Mutex<HashMap<String, Script>>,
    gates: Mutex<HashMap<String, Arc<Gate>>>,
    calls: Mutex<Vec<FetchRequest>>,
}

/// `Fetcher` answering from per-URL canned responses
///
/// Unscripted URLs fail with a network error.
#[derive(Clone, Default)]
pub struct ScriptedFetcher {
    inner: Arc<Inner>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, response: CachedResponse) -> &Self {
        self.inner
            .scripts
            .lock()
            .insert(url.to_string(), Script::Respond(response));
        self
    }

    /// `200` with a body
    pub fn ok(&self, url: &str, body: &str) -> &Self {
        self.respond(url, CachedResponse::ok(body.to_string()))
    }

    /// Empty response with a status
    pub fn status(&self, url: &str, status: u16) -> &Self {
        self.respond(url, CachedResponse::with_status(status))
    }

    pub fn fail(&self, url: &str, error: CacheError) -> &Self {
        self.inner
            .scripts
            .lock()
            .insert(url.to_string(), Script::Fail(error));
        self
    }

    /// Hold fetches of `url` until the returned gate is released
    pub fn gate(&self, url: &str) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.inner
            .gates
            .lock()
            .insert(url.to_string(), gate.clone());
        gate
    }

    /// Every request seen so far
    pub fn calls(&self) -> Vec<FetchRequest> {
        self.inner.calls.lock().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.inner
            .calls
            .lock()
            .iter()
            .filter(|r| r.url.as_str() == url)
            .count()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<CachedResponse, CacheError> {
        let url = request.cache_key();
        self.inner.calls.lock().push(request.clone());

        let gate = self.inner.gates.lock().get(&url).cloned();
        if let Some(gate) = gate {
            gate.pass().await;
        }

        match self.inner.scripts.lock().get(&url) {
            Some(Script::Respond(response)) => Ok(response.clone()),
            Some(Script::Fail(error)) => Err(error.clone()),
            None => Err(CacheError::Network(format!("unreachable: {}", url))),
        }
    }
}

pub fn config() -> WorkerConfig {
    WorkerConfig::from_scope(SCOPE)
        .unwrap()
        .with_prefix("app")
        .with_version("v1")
}

/// Context over the given storage and fetcher, dropping events
pub fn context_with(storage: MemoryStorage, fetcher: ScriptedFetcher) -> CacheContext {
    CacheContext::new(config(), Arc::new(storage), Arc::new(fetcher), Arc::new(NoopBus))
}

/// Context with a live bus and its first subscriber
pub fn observed_context(
    storage: MemoryStorage,
    fetcher: ScriptedFetcher,
) -> (CacheContext, EventSubscriber) {
    let (bus, events) = BroadcastBus::new(256);
    let ctx = CacheContext::new(config(), Arc::new(storage), Arc::new(fetcher), Arc::new(bus));
    (ctx, events)
}
