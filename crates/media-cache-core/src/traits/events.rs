//! Observer fan-out seam

use crate::WorkerEvent;

/// Delivers events to every connected observer
///
/// Publishing never fails from the caller's point of view; a bus with
/// no observers drops the event.
pub trait EventBus: Send + Sync + 'static {
    fn publish(&self, event: WorkerEvent);
}

/// Bus that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBus;

impl EventBus for NoopBus {
    #[inline]
    fn publish(&self, _event: WorkerEvent) {}
}
