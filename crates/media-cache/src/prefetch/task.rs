//! State of one prefetch task

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use media_cache_core::{now_millis, PrefetchReport, PrefetchStatus, UrlFailure};

/// Where a task is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    /// URLs are still being visited
    Running,
    /// The loop reached a terminal status on its own
    Finished,
    /// Aborted by a caller; results arriving later are dropped
    Discarded,
}

#[derive(Debug)]
struct Progress {
    phase: TaskPhase,
    status: PrefetchStatus,
    completed: usize,
    failed: usize,
    bytes_downloaded: u64,
    current_url: Option<String>,
    error: Option<String>,
    errors: Vec<UrlFailure>,
    finished_at: Option<u64>,
}

/// Counters, phase and cancellation token of a running task
///
/// Every mutation goes through the phase check, so once a task is
/// [`TaskPhase::Discarded`] nothing can change its counters or publish
/// another report.
#[derive(Debug)]
pub struct TaskCell {
    task_id: String,
    label: String,
    total: usize,
    started_at: u64,
    token: CancellationToken,
    progress: Mutex<Progress>,
}

impl TaskCell {
    pub fn new(task_id: impl Into<String>, label: impl Into<String>, total: usize) -> Self {
        Self {
            task_id: task_id.into(),
            label: label.into(),
            total,
            started_at: now_millis(),
            token: CancellationToken::new(),
            progress: Mutex::new(Progress {
                phase: TaskPhase::Running,
                status: PrefetchStatus::Running,
                completed: 0,
                failed: 0,
                bytes_downloaded: 0,
                current_url: None,
                error: None,
                errors: Vec::new(),
                finished_at: None,
            }),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn phase(&self) -> TaskPhase {
        self.progress.lock().phase
    }

    pub fn is_discarded(&self) -> bool {
        self.phase() == TaskPhase::Discarded
    }

    /// Current state as a report
    pub fn snapshot(&self) -> PrefetchReport {
        self.report(&self.progress.lock())
    }

    /// Publish the current state while the task is still running
    ///
    /// Returns `false` once the task is no longer running.
    pub(crate) fn announce(&self, notify: impl FnOnce(&PrefetchReport)) -> bool {
        let p = self.progress.lock();
        if p.phase != TaskPhase::Running {
            return false;
        }
        notify(&self.report(&p));
        true
    }

    /// Mark `url` as the one being fetched
    ///
    /// Returns `false` once the task is no longer running.
    pub(crate) fn begin_url(&self, url: &str) -> bool {
        let mut p = self.progress.lock();
        if p.phase != TaskPhase::Running {
            return false;
        }
        p.current_url = Some(url.to_string());
        p.error = None;
        true
    }

    /// Count a stored URL; `None` if the task is no longer running
    pub(crate) fn record_success(
        &self,
        bytes: u64,
        notify: impl FnOnce(&PrefetchReport),
    ) -> Option<PrefetchReport> {
        self.transition(notify, |p| {
            p.completed += 1;
            p.bytes_downloaded = p.bytes_downloaded.saturating_add(bytes);
            p.error = None;
        })
    }

    /// Count a failed URL; `None` if the task is no longer running
    pub(crate) fn record_failure(
        &self,
        url: &str,
        error: String,
        notify: impl FnOnce(&PrefetchReport),
    ) -> Option<PrefetchReport> {
        self.transition(notify, |p| {
            p.failed += 1;
            p.current_url = Some(url.to_string());
            p.error = Some(error.clone());
            p.errors.push(UrlFailure {
                url: url.to_string(),
                error,
            });
        })
    }

    /// Terminal report of a loop that ran out of URLs or saw cancellation
    ///
    /// `None` if the task was discarded first.
    pub(crate) fn finish(&self, notify: impl FnOnce(&PrefetchReport)) -> Option<PrefetchReport> {
        let cancelled = self.token.is_cancelled();
        let total = self.total;
        self.transition(notify, |p| {
            p.status = if cancelled {
                PrefetchStatus::Aborted
            } else if p.failed > 0 {
                PrefetchStatus::Error
            } else {
                PrefetchStatus::Completed
            };
            p.phase = TaskPhase::Finished;
            p.current_url = None;
            p.error = match p.status {
                PrefetchStatus::Error => Some(format!("{} of {} downloads failed", p.failed, total)),
                _ => None,
            };
            p.finished_at = Some(now_millis());
        })
    }

    /// Abort with the last known counters
    ///
    /// `None` if the task had already finished or been discarded.
    pub(crate) fn discard(&self, notify: impl FnOnce(&PrefetchReport)) -> Option<PrefetchReport> {
        self.token.cancel();
        self.transition(notify, |p| {
            p.phase = TaskPhase::Discarded;
            p.status = PrefetchStatus::Aborted;
            p.finished_at = Some(now_millis());
        })
    }

    /// Apply `change` to a running task and hand the result to `notify`
    ///
    /// `notify` runs under the progress lock, so the reports of one task
    /// reach observers in the order their changes were made.
    fn transition(
        &self,
        notify: impl FnOnce(&PrefetchReport),
        change: impl FnOnce(&mut Progress),
    ) -> Option<PrefetchReport> {
        let mut p = self.progress.lock();
        if p.phase != TaskPhase::Running {
            return None;
        }
        change(&mut p);
        let report = self.report(&p);
        notify(&report);
        Some(report)
    }

    fn report(&self, p: &Progress) -> PrefetchReport {
        PrefetchReport {
            task_id: self.task_id.clone(),
            label: self.label.clone(),
            status: p.status,
            total: self.total,
            completed: p.completed,
            failed: p.failed,
            bytes_downloaded: p.bytes_downloaded,
            current_url: p.current_url.clone(),
            error: p.error.clone(),
            errors: p.errors.clone(),
            started_at: self.started_at,
            finished_at: p.finished_at,
        }
    }
}
