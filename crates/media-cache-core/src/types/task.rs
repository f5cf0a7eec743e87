//! Prefetch task state as seen by observers

use serde::{Deserialize, Serialize};

/// Lifecycle status of a prefetch task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefetchStatus {
    Idle,
    Running,
    Completed,
    Error,
    Aborted,
}

impl PrefetchStatus {
    /// Completed, error and aborted end a task
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PrefetchStatus::Completed | PrefetchStatus::Error | PrefetchStatus::Aborted
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PrefetchStatus::Idle => "idle",
            PrefetchStatus::Running => "running",
            PrefetchStatus::Completed => "completed",
            PrefetchStatus::Error => "error",
            PrefetchStatus::Aborted => "aborted",
        }
    }
}

/// One failed URL within a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlFailure {
    pub url: String,
    pub error: String,
}

/// Snapshot of a task, broadcast as `PREFETCH_VIDEOS_UPDATE`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefetchReport {
    pub task_id: String,
    pub label: String,
    pub status: PrefetchStatus,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub bytes_downloaded: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<UrlFailure>,
    /// Milliseconds since the Unix epoch
    pub started_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<u64>,
}

impl PrefetchReport {
    /// URLs visited so far
    pub fn visited(&self) -> usize {
        self.completed + self.failed
    }
}
