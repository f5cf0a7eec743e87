use std::sync::Arc;
use tokio::sync::broadcast;
use dashmap::DashMap;
use media_cache_core::{CachedResponse, Result};

/// Leader's claim on an in-flight key
///
/// Releases the key when dropped, whether or not a result was sent.
struct Lead<'a> {
    inflight: &'a DashMap<String, broadcast::Sender<Result<CachedResponse>>>,
    key: &'a str,
    tx: broadcast::Sender<Result<CachedResponse>>,
}

impl Lead<'_> {
    fn complete(self, result: Result<CachedResponse>) {
        self.release();
        if self.tx.receiver_count() > 0 {
            let _ = self.tx.send(result);
        }
    }

    fn release(&self) {
        // Only our own channel; a new leader may already own the key
        self.inflight
            .remove_if(self.key, |_, tx| tx.same_channel(&self.tx));
    }
}

impl Drop for Lead<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

/// De-duplicates concurrent network work per key
#[derive(Clone, Default)]
pub struct Coalescer {
    // Map key -> Broadcast channel sender
    // The sender transmits the result of the network fetch
    inflight: Arc<DashMap<String, broadcast::Sender<Result<CachedResponse>>>>,
    // Set of keys currently being revalidated in background (SWR)
    refreshing: Arc<DashMap<String, ()>>,
}

impl Coalescer {
    pub fn new() -> Self {
        Self {
            inflight: Arc::new(DashMap::new()),
            refreshing: Arc::new(DashMap::new()),
        }
    }

    /// Execute a fetch with coalescing for the given key.
    /// If a fetch for this key is already running, wait for its result.
    /// Otherwise, run the fetch and broadcast the result.
    ///
    /// A leader dropped before it finishes releases the key; its followers
    /// see the channel close and one of them runs the fetch instead.
    pub async fn do_request<F, Fut>(&self, key: &str, f: F) -> Result<CachedResponse>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<CachedResponse>> + Send + 'static,
    {
        loop {
            // The DashMap entry lock is dropped at the end of this scope
            let action = {
                let entry = self.inflight.entry(key.to_string());
                match entry {
                    dashmap::mapref::entry::Entry::Occupied(o) => Ok(o.get().subscribe()),
                    dashmap::mapref::entry::Entry::Vacant(v) => {
                        let (tx, _rx) = broadcast::channel(1);
                        v.insert(tx.clone());
                        Err(tx)
                    }
                }
            };

            match action {
                Ok(mut rx) => match rx.recv().await {
                    Ok(res) => return res,
                    // Leader went away without a result: take over
                    Err(_) => continue,
                },
                Err(tx) => {
                    let lead = Lead {
                        inflight: self.inflight.as_ref(),
                        key,
                        tx,
                    };
                    let result = f().await;
                    lead.complete(result.clone());
                    return result;
                }
            }
        }
    }

    /// Try to spawn a background revalidation for the given key.
    /// If one is already running for this key, this is a no-op.
    ///
    /// Returns `true` if a task was spawned.
    pub fn try_spawn_refresh<F, Fut>(&self, key: &str, task_factory: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let key_str = key.to_string();
        let should_run = match self.refreshing.entry(key_str.clone()) {
            dashmap::mapref::entry::Entry::Vacant(v) => {
                v.insert(());
                true
            }
            dashmap::mapref::entry::Entry::Occupied(_) => false,
        };

        if should_run {
            let task = task_factory();
            let map = self.refreshing.clone();
            tokio::spawn(async move {
                task.await;
                map.remove(&key_str);
            });
        }
        should_run
    }

    /// Whether a background revalidation is running for `key`
    pub fn is_refreshing(&self, key: &str) -> bool {
        self.refreshing.contains_key(key)
    }
}
