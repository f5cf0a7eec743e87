//! In-process event fan-out
//!
//! Every observer holds its own [`EventSubscriber`] and sees every event
//! published after it subscribed.

use tokio::sync::broadcast;

use media_cache_core::{EventBus, WorkerEvent};

/// Default number of buffered events per subscriber
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Broadcast bus backed by a `tokio` broadcast channel
#[derive(Clone)]
pub struct BroadcastBus {
    tx: broadcast::Sender<WorkerEvent>,
}

impl BroadcastBus {
    /// Create a new bus and its first subscriber
    pub fn new(capacity: usize) -> (Self, EventSubscriber) {
        let (tx, rx) = broadcast::channel(capacity.max(1));
        (Self { tx }, EventSubscriber { rx })
    }

    /// Get a new subscriber
    pub fn subscribe(&self) -> EventSubscriber {
        EventSubscriber {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of connected observers
    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY).0
    }
}

impl EventBus for BroadcastBus {
    fn publish(&self, event: WorkerEvent) {
        let kind = event.kind();
        match self.tx.send(event) {
            Ok(observers) => {
                tracing::trace!(target: "media_cache", event = kind, observers, "event published")
            }
            Err(_) => {
                tracing::trace!(target: "media_cache", event = kind, "no observers, event dropped")
            }
        }
    }
}

/// One observer's view of the event stream
pub struct EventSubscriber {
    rx: broadcast::Receiver<WorkerEvent>,
}

impl EventSubscriber {
    /// Receive the next event
    pub async fn recv(&mut self) -> Result<WorkerEvent, SubscribeError> {
        self.rx.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => SubscribeError::Closed,
            broadcast::error::RecvError::Lagged(n) => SubscribeError::Lagged(n),
        })
    }

    /// Receive an already-buffered event without waiting
    pub fn try_recv(&mut self) -> Result<WorkerEvent, SubscribeError> {
        self.rx.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => SubscribeError::Empty,
            broadcast::error::TryRecvError::Closed => SubscribeError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => SubscribeError::Lagged(n),
        })
    }

    /// Drain every buffered event
    pub fn drain(&mut self) -> Vec<WorkerEvent> {
        let mut events = Vec::new();
        loop {
            match self.try_recv() {
                Ok(event) => events.push(event),
                Err(SubscribeError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        events
    }
}

/// Error when receiving events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeError {
    /// Nothing buffered right now
    Empty,
    /// Bus dropped
    Closed,
    /// Subscriber lagged behind
    Lagged(u64),
}

impl std::fmt::Display for SubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscribeError::Empty => write!(f, "no event buffered"),
            SubscribeError::Closed => write!(f, "channel closed"),
            SubscribeError::Lagged(n) => write!(f, "lagged behind by {} messages", n),
        }
    }
}

impl std::error::Error for SubscribeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_and_receive() {
        let (bus, mut sub) = BroadcastBus::new(16);
        bus.publish(WorkerEvent::CacheVersion {
            version: "v2".into(),
        });

        let event = sub.recv().await.unwrap();
        assert_eq!(
            event,
            WorkerEvent::CacheVersion {
                version: "v2".into()
            }
        );
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let (bus, mut sub1) = BroadcastBus::new(16);
        let mut sub2 = bus.subscribe();
        assert_eq!(bus.observer_count(), 2);

        bus.publish(WorkerEvent::CacheCleared {
            bucket_name: "app-media-v1".into(),
            cleared_at: 1,
        });

        assert_eq!(sub1.recv().await.unwrap().kind(), "CACHE_CLEARED");
        assert_eq!(sub2.recv().await.unwrap().kind(), "CACHE_CLEARED");
    }

    #[test]
    fn test_publish_without_observers() {
        let bus = BroadcastBus::default();
        assert_eq!(bus.observer_count(), 0);
        bus.publish(WorkerEvent::CacheVersion {
            version: "v1".into(),
        });
    }

    #[test]
    fn test_drain() {
        let (bus, mut sub) = BroadcastBus::new(4);
        for v in ["a", "b"] {
            bus.publish(WorkerEvent::CacheVersion { version: v.into() });
        }
        assert_eq!(sub.drain().len(), 2);
        assert_eq!(sub.try_recv(), Err(SubscribeError::Empty));
    }
}
