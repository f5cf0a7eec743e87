use std::collections::HashSet;
use std::sync::Arc;

use tokio::task::JoinHandle;
use url::Url;

use media_cache_core::{
    format_bytes, now_millis, BucketKind, CacheError, Credentials, FetchRequest, PrefetchReport,
    PrefetchStatus, RequestMode, Result, WorkerEvent,
};

use super::registry::TaskRegistry;
use super::task::TaskCell;
use crate::accounting;
use crate::context::CacheContext;
use crate::expiration::{fresh_entry, store};
use crate::inventory::InventoryService;

/// Label given to single-URL tasks
pub const SINGLE_LABEL: &str = "single";

/// Handle to a started task
pub struct PrefetchHandle {
    task_id: String,
    state: HandleState,
}

enum HandleState {
    Done(PrefetchReport),
    Running(JoinHandle<PrefetchReport>),
}

impl PrefetchHandle {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Wait for the task's terminal report
    ///
    /// An aborted task resolves to the report it had when it was aborted.
    pub async fn wait(self) -> Result<PrefetchReport> {
        match self.state {
            HandleState::Done(report) => Ok(report),
            HandleState::Running(join) => join
                .await
                .map_err(|e| CacheError::Internal(format!("prefetch task failed: {}", e))),
        }
    }
}

/// Starts, runs and aborts prefetch tasks
///
/// URLs of a task are visited one at a time, in order. Each task's event
/// stream is produced by that single loop, so its updates are strictly
/// ordered.
#[derive(Clone)]
pub struct PrefetchManager {
    ctx: CacheContext,
    tasks: TaskRegistry,
    inventory: InventoryService,
}

impl PrefetchManager {
    pub fn new(ctx: CacheContext, tasks: TaskRegistry) -> Self {
        Self {
            inventory: InventoryService::new(ctx.clone()),
            ctx,
            tasks,
        }
    }

    pub fn tasks(&self) -> &TaskRegistry {
        &self.tasks
    }

    /// Resolve against the scope and de-duplicate, keeping first-seen order
    ///
    /// URLs that cannot be resolved are dropped with a warning.
    pub fn normalize_urls<I, S>(&self, urls: I) -> Vec<Url>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        for raw in urls {
            let raw = raw.as_ref();
            match self.ctx.config.resolve(raw) {
                Ok(url) => {
                    if seen.insert(url.as_str().to_string()) {
                        resolved.push(url);
                    }
                }
                Err(e) => {
                    tracing::warn!(target: "media_cache", url = raw, error = %e, "skipping unresolvable url");
                }
            }
        }
        resolved
    }

    /// Start a task over `urls`
    ///
    /// The task is registered and its `running` update published before
    /// this returns; the downloads then run on a spawned task. An empty
    /// list yields an `idle` report and registers nothing.
    pub fn start_task<I, S>(
        &self,
        urls: I,
        label: impl Into<String>,
        task_id: Option<String>,
    ) -> Result<PrefetchHandle>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let urls = self.normalize_urls(urls);
        let label = label.into();
        let task_id = task_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(generate_task_id);

        if urls.is_empty() {
            let now = now_millis();
            let report = PrefetchReport {
                task_id: task_id.clone(),
                label,
                status: PrefetchStatus::Idle,
                total: 0,
                completed: 0,
                failed: 0,
                bytes_downloaded: 0,
                current_url: None,
                error: None,
                errors: Vec::new(),
                started_at: now,
                finished_at: Some(now),
            };
            self.ctx
                .publish(WorkerEvent::PrefetchVideosUpdate(report.clone()));
            return Ok(PrefetchHandle {
                task_id,
                state: HandleState::Done(report),
            });
        }

        let cell = Arc::new(TaskCell::new(task_id.clone(), label, urls.len()));
        self.tasks.insert(cell.clone())?;
        tracing::info!(
            target: "media_cache",
            task_id = %task_id,
            label = cell.label(),
            total = urls.len(),
            "prefetch started"
        );
        cell.announce(self.publisher());

        let manager = self.clone();
        let join = tokio::spawn(async move { manager.run(cell, urls).await });

        Ok(PrefetchHandle {
            task_id,
            state: HandleState::Running(join),
        })
    }

    /// Cache one URL as its own task
    pub fn cache_single(&self, url: &str) -> Result<PrefetchHandle> {
        self.start_task([url], SINGLE_LABEL, None)
    }

    /// Abort a live task
    ///
    /// The task leaves the registry at once and an `aborted` update with
    /// its last counters is published. A fetch still in flight finishes in
    /// the background and its result is dropped.
    pub fn abort_task(&self, task_id: &str) -> Result<PrefetchReport> {
        let cell = self
            .tasks
            .remove(task_id)
            .ok_or_else(|| CacheError::UnknownTask(task_id.to_string()))?;

        match cell.discard(self.publisher()) {
            Some(report) => {
                tracing::info!(
                    target: "media_cache",
                    task_id,
                    completed = report.completed,
                    failed = report.failed,
                    "prefetch aborted"
                );
                Ok(report)
            }
            // Finished between our lookup and the discard; its terminal update is already out
            None => Ok(cell.snapshot()),
        }
    }

    /// Publish the current report of a live task
    ///
    /// Returns `false` when no such task is running.
    pub fn republish(&self, task_id: &str) -> bool {
        self.tasks
            .get(task_id)
            .is_some_and(|cell| cell.announce(self.publisher()))
    }

    /// Cancel every live task at its next URL
    pub fn shutdown(&self) {
        self.tasks.cancel_all();
    }

    /// Delete the media bucket
    pub async fn clear_media(&self) -> Result<bool> {
        let name = self.ctx.registry.name(BucketKind::Media).to_string();
        self.clear_bucket(&name).await
    }

    /// Delete a bucket, then publish a cleared notice and a fresh summary
    ///
    /// Returns whether the bucket existed.
    pub async fn clear_bucket(&self, bucket: &str) -> Result<bool> {
        let existed = self.ctx.storage.delete_bucket(bucket).await?;
        tracing::info!(target: "media_cache", bucket, existed, "bucket cleared");

        self.ctx.publish(WorkerEvent::CacheCleared {
            bucket_name: bucket.to_string(),
            cleared_at: now_millis(),
        });
        self.inventory.broadcast_summary().await?;
        Ok(existed)
    }

    async fn run(self, cell: Arc<TaskCell>, urls: Vec<Url>) -> PrefetchReport {
        let media = self.ctx.spec(BucketKind::Media);

        for url in &urls {
            if cell.token().is_cancelled() {
                break;
            }
            let key = url.as_str();
            if !cell.begin_url(key) {
                return cell.snapshot();
            }

            let update = if let Some(entry) = fresh_entry(&self.ctx, media, key).await {
                tracing::debug!(target: "media_cache", task_id = cell.task_id(), url = key, "already cached");
                cell.record_success(accounting::measure(&entry.response), self.publisher())
            } else {
                let request = FetchRequest::get(url.clone())
                    .mode(RequestMode::Cors)
                    .credentials(Credentials::Omit);
                let outcome = self.ctx.fetcher.fetch(&request).await;

                if cell.is_discarded() {
                    tracing::debug!(
                        target: "media_cache",
                        task_id = cell.task_id(),
                        url = key,
                        "task aborted, dropping late result"
                    );
                    return cell.snapshot();
                }

                match outcome {
                    Ok(response) if response.is_success() => {
                        let bytes = accounting::measure(&response);
                        match store(&self.ctx, media, key, response).await {
                            Ok(()) => {
                                let update = cell.record_success(bytes, self.publisher());
                                if update.is_none() {
                                    self.drop_late_entry(&cell, &media.name, key).await;
                                }
                                update
                            }
                            Err(e) => self.fail(&cell, key, e),
                        }
                    }
                    Ok(response) => {
                        let err = CacheError::Status {
                            status: response.status,
                            url: key.to_string(),
                        };
                        self.fail(&cell, key, err)
                    }
                    Err(e) => self.fail(&cell, key, e),
                }
            };

            if update.is_none() {
                return cell.snapshot();
            }
        }

        self.finalize(&cell).await
    }

    /// Publishes a task report as a progress event
    fn publisher(&self) -> impl Fn(&PrefetchReport) + '_ {
        move |report: &PrefetchReport| {
            self.ctx
                .publish(WorkerEvent::PrefetchVideosUpdate(report.clone()))
        }
    }

    fn fail(&self, cell: &TaskCell, url: &str, error: CacheError) -> Option<PrefetchReport> {
        tracing::warn!(
            target: "media_cache",
            task_id = cell.task_id(),
            url,
            error = %error,
            "prefetch failed for url"
        );
        cell.record_failure(url, error.to_string(), self.publisher())
    }

    /// Remove an entry written after its task was aborted
    async fn drop_late_entry(&self, cell: &TaskCell, bucket: &str, url: &str) {
        tracing::debug!(
            target: "media_cache",
            task_id = cell.task_id(),
            url,
            "task aborted during write, removing entry"
        );
        if let Err(e) = self.ctx.storage.delete(bucket, url).await {
            tracing::warn!(target: "media_cache", bucket, url, error = %e, "late entry not removed");
        }
    }

    async fn finalize(&self, cell: &Arc<TaskCell>) -> PrefetchReport {
        self.tasks.remove_cell(cell);
        let Some(report) = cell.finish(self.publisher()) else {
            return cell.snapshot();
        };

        tracing::info!(
            target: "media_cache",
            task_id = cell.task_id(),
            status = report.status.as_str(),
            completed = report.completed,
            failed = report.failed,
            downloaded = %format_bytes(report.bytes_downloaded),
            "prefetch finished"
        );

        if let Err(e) = self.inventory.broadcast_summary().await {
            tracing::warn!(target: "media_cache", error = %e, "summary after prefetch failed");
        }
        report
    }
}

/// `prefetch-<millis>-<base36 random>`
fn generate_task_id() -> String {
    let mut n = rand::random::<u64>();
    let mut suffix = String::new();
    for _ in 0..8 {
        let digit = (n % 36) as u32;
        n /= 36;
        suffix.push(std::char::from_digit(digit, 36).unwrap_or('0'));
    }
    format!("prefetch-{}-{}", now_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, context_with, observed_context, Gate, ScriptedFetcher};
    use async_trait::async_trait;
    use media_cache_core::{
        CacheEntry, CacheStorage, CachedResponse, EventBus, NoopBus, StorageEstimate,
    };
    use media_cache_storage::MemoryStorage;
    use parking_lot::Mutex;
    use std::sync::mpsc;
    use std::time::Duration;

    /// Records task updates in publish order, holding the first
    /// `completed == 1` progress update until resumed
    struct HoldingBus {
        log: Mutex<Vec<(PrefetchStatus, usize)>>,
        held: Mutex<mpsc::SyncSender<()>>,
        resume: Mutex<mpsc::Receiver<()>>,
    }

    impl EventBus for HoldingBus {
        fn publish(&self, event: WorkerEvent) {
            let WorkerEvent::PrefetchVideosUpdate(report) = event else {
                return;
            };
            if report.status == PrefetchStatus::Running && report.completed == 1 {
                let _ = self.held.lock().send(());
                let _ = self.resume.lock().recv_timeout(Duration::from_secs(2));
            }
            self.log.lock().push((report.status, report.completed));
        }
    }

    /// Memory storage whose writes wait on a gate
    struct GatedWrites {
        inner: MemoryStorage,
        gate: Arc<Gate>,
    }

    #[async_trait]
    impl CacheStorage for GatedWrites {
        async fn bucket_names(&self) -> Result<Vec<String>> {
            self.inner.bucket_names().await
        }

        async fn has_bucket(&self, bucket: &str) -> Result<bool> {
            self.inner.has_bucket(bucket).await
        }

        async fn delete_bucket(&self, bucket: &str) -> Result<bool> {
            self.inner.delete_bucket(bucket).await
        }

        async fn keys(&self, bucket: &str) -> Result<Vec<String>> {
            self.inner.keys(bucket).await
        }

        async fn get(&self, bucket: &str, key: &str) -> Result<Option<CacheEntry>> {
            self.inner.get(bucket, key).await
        }

        async fn peek(&self, bucket: &str, key: &str) -> Result<Option<CacheEntry>> {
            self.inner.peek(bucket, key).await
        }

        async fn put(&self, bucket: &str, key: &str, response: CachedResponse) -> Result<()> {
            self.gate.pass().await;
            self.inner.put(bucket, key, response).await
        }

        async fn delete(&self, bucket: &str, key: &str) -> Result<bool> {
            self.inner.delete(bucket, key).await
        }

        async fn estimate(&self) -> Result<StorageEstimate> {
            self.inner.estimate().await
        }
    }

    #[test]
    fn test_generate_task_id() {
        let id = generate_task_id();
        let parts: Vec<&str> = id.splitn(3, '-').collect();
        assert_eq!(parts[0], "prefetch");
        assert!(parts[1].parse::<u64>().is_ok());
        assert_eq!(parts[2].len(), 8);
        assert_ne!(generate_task_id(), generate_task_id());
    }

    #[test]
    fn test_normalize_dedupes_relative_and_absolute() {
        let manager = PrefetchManager::new(
            context_with(MemoryStorage::with_defaults(), ScriptedFetcher::new()),
            TaskRegistry::new(),
        );
        let urls = manager.normalize_urls([
            "/a.mp4",
            "/a.mp4",
            "b.mp4",
            "https://host/b.mp4",
            "a.mp4#t=3",
            "http://[::1",
        ]);
        let urls: Vec<&str> = urls.iter().map(Url::as_str).collect();
        assert_eq!(urls, vec!["https://host/a.mp4", "https://host/b.mp4"]);
    }

    #[tokio::test]
    async fn test_run_counts_and_caches() {
        let storage = MemoryStorage::with_defaults();
        let fetcher = ScriptedFetcher::new();
        fetcher.ok("https://host/a.mp4", "aaaa");
        fetcher.ok("https://host/b.mp4", "bb");
        let (ctx, mut events) = observed_context(storage.clone(), fetcher.clone());
        let manager = PrefetchManager::new(ctx, TaskRegistry::new());

        let handle = manager
            .start_task(["/a.mp4", "b.mp4"], "week 1", Some("t1".into()))
            .unwrap();
        assert_eq!(handle.task_id(), "t1");
        let report = handle.wait().await.unwrap();

        assert_eq!(report.status, PrefetchStatus::Completed);
        assert_eq!(report.completed, 2);
        assert_eq!(report.bytes_downloaded, 6);
        assert!(manager.tasks().is_empty());
        assert_eq!(storage.len("app-media-v1").await.unwrap(), 2);

        let requests = fetcher.calls();
        assert!(requests.iter().all(|r| r.credentials == Credentials::Omit));
        assert!(requests.iter().all(|r| r.mode == RequestMode::Cors));

        let kinds: Vec<&str> = events.drain().iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                "PREFETCH_VIDEOS_UPDATE",
                "PREFETCH_VIDEOS_UPDATE",
                "PREFETCH_VIDEOS_UPDATE",
                "PREFETCH_VIDEOS_UPDATE",
                "CACHE_SUMMARY",
            ]
        );
    }

    #[tokio::test]
    async fn test_already_cached_urls_are_not_fetched() {
        let storage = MemoryStorage::with_defaults();
        storage
            .put(
                "app-media-v1",
                "https://host/a.mp4",
                media_cache_core::CachedResponse::ok("x").header("content-length", "50"),
            )
            .await
            .unwrap();
        let fetcher = ScriptedFetcher::new();
        let manager = PrefetchManager::new(
            context_with(storage, fetcher.clone()),
            TaskRegistry::new(),
        );

        let report = manager
            .start_task(["a.mp4"], "", None)
            .unwrap()
            .wait()
            .await
            .unwrap();
        assert_eq!(report.status, PrefetchStatus::Completed);
        assert_eq!(report.bytes_downloaded, 50);
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_live_task_id_rejected() {
        let fetcher = ScriptedFetcher::new();
        let gate = fetcher.gate("https://host/a.mp4");
        fetcher.ok("https://host/a.mp4", "a");
        let manager = PrefetchManager::new(
            context_with(MemoryStorage::with_defaults(), fetcher),
            TaskRegistry::new(),
        );

        let first = manager.start_task(["a.mp4"], "", Some("t".into())).unwrap();
        let second = manager.start_task(["a.mp4"], "", Some("t".into()));
        assert!(matches!(second, Err(CacheError::DuplicateTask(_))));

        gate.release();
        assert_eq!(first.wait().await.unwrap().status, PrefetchStatus::Completed);
    }

    #[tokio::test]
    async fn test_abort_unknown_task() {
        let manager = PrefetchManager::new(
            context_with(MemoryStorage::with_defaults(), ScriptedFetcher::new()),
            TaskRegistry::new(),
        );
        assert!(matches!(
            manager.abort_task("nope"),
            Err(CacheError::UnknownTask(_))
        ));
    }

    #[tokio::test]
    async fn test_shutdown_finishes_as_aborted() {
        let fetcher = ScriptedFetcher::new();
        let gate = fetcher.gate("https://host/a.mp4");
        fetcher.ok("https://host/a.mp4", "a");
        fetcher.ok("https://host/b.mp4", "b");
        let manager = PrefetchManager::new(
            context_with(MemoryStorage::with_defaults(), fetcher.clone()),
            TaskRegistry::new(),
        );

        let handle = manager.start_task(["a.mp4", "b.mp4"], "", None).unwrap();
        gate.entered().await;
        manager.shutdown();
        gate.release();

        let report = handle.wait().await.unwrap();
        assert_eq!(report.status, PrefetchStatus::Aborted);
        assert_eq!(report.completed, 1);
        assert_eq!(fetcher.call_count("https://host/b.mp4"), 0);
        assert!(manager.tasks().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_abort_is_the_last_update_of_a_task() {
        let fetcher = ScriptedFetcher::new();
        fetcher.ok("https://host/a.mp4", "a");
        fetcher.ok("https://host/b.mp4", "b");
        let (held_tx, held_rx) = mpsc::sync_channel(1);
        let (resume_tx, resume_rx) = mpsc::channel();
        let bus = Arc::new(HoldingBus {
            log: Mutex::new(Vec::new()),
            held: Mutex::new(held_tx),
            resume: Mutex::new(resume_rx),
        });
        let ctx = CacheContext::new(
            testing::config(),
            Arc::new(MemoryStorage::with_defaults()),
            Arc::new(fetcher),
            bus.clone(),
        );
        let manager = PrefetchManager::new(ctx, TaskRegistry::new());

        let handle = manager
            .start_task(["a.mp4", "b.mp4"], "", Some("t".into()))
            .unwrap();
        tokio::task::spawn_blocking(move || held_rx.recv_timeout(Duration::from_secs(2)))
            .await
            .unwrap()
            .unwrap();

        // Abort while the first progress update is mid-publish
        let aborting = {
            let manager = manager.clone();
            tokio::task::spawn_blocking(move || manager.abort_task("t"))
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        resume_tx.send(()).unwrap();
        let aborted = aborting.await.unwrap().unwrap();
        assert_eq!(handle.wait().await.unwrap().status, PrefetchStatus::Aborted);

        let log = bus.log.lock().clone();
        assert_eq!(log.last(), Some(&(PrefetchStatus::Aborted, aborted.completed)));
        let terminal = log
            .iter()
            .filter(|(status, _)| *status == PrefetchStatus::Aborted)
            .count();
        assert_eq!(terminal, 1);
    }

    #[tokio::test]
    async fn test_abort_during_write_leaves_no_entry() {
        let storage = MemoryStorage::with_defaults();
        let gate = Arc::new(Gate::default());
        let fetcher = ScriptedFetcher::new();
        fetcher.ok("https://host/a.mp4", "aaaa");
        let ctx = CacheContext::new(
            testing::config(),
            Arc::new(GatedWrites {
                inner: storage.clone(),
                gate: gate.clone(),
            }),
            Arc::new(fetcher),
            Arc::new(NoopBus),
        );
        let manager = PrefetchManager::new(ctx, TaskRegistry::new());

        let handle = manager.start_task(["a.mp4"], "", Some("t".into())).unwrap();
        gate.entered().await;
        let aborted = manager.abort_task("t").unwrap();
        assert_eq!(aborted.completed, 0);
        gate.release();

        let report = handle.wait().await.unwrap();
        assert_eq!(report.status, PrefetchStatus::Aborted);
        assert_eq!(report.completed, 0);
        assert_eq!(storage.len("app-media-v1").await.unwrap(), 0);
        assert_eq!(storage.usage(), 0);
    }
}
