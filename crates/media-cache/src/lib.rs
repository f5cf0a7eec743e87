//! media-cache: offline media cache and background prefetch engine
//!
//! # Features
//!
//! - **Strategy routing** of intercepted requests into versioned buckets
//!   (network-first, stale-while-revalidate, cache-first with byte ranges)
//! - **Prefetch tasks** with ordered downloads, abort and byte-level progress
//! - **Inventory snapshots** of every bucket, broadcast to all observers
//! - **Version cleanup** retiring the buckets of previous deployments
//! - **Metrics integration**
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use media_cache::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let config = WorkerConfig::from_scope("https://example.com/")?;
//!     let worker = MediaWorker::builder(config).build()?;
//!     let mut events = worker.subscribe().ok_or("worker has no event bus")?;
//!
//!     worker
//!         .handle_json(r#"{"type":"PREFETCH_VIDEOS","urls":["/videos/intro.mp4"],"label":"intro"}"#)
//!         .await;
//!
//!     while let Ok(event) = events.recv().await {
//!         println!("{}", event.to_json()?);
//!     }
//!     Ok(())
//! }
//! ```

pub mod accounting;
mod bus;
mod config;
mod context;
pub mod expiration;
mod inventory;
mod lifecycle;
pub mod prefetch;
mod registry;
mod router;
mod strategy;
mod worker;

// Re-export core
pub use media_cache_core::*;

// Re-export storage and HTTP
pub use media_cache_http::{FetchConfig, HttpFetcher};
#[cfg(feature = "memory")]
pub use media_cache_storage::{MemoryConfig, MemoryStorage};

pub use bus::{BroadcastBus, EventSubscriber, SubscribeError, DEFAULT_EVENT_CAPACITY};
pub use config::WorkerConfig;
pub use context::CacheContext;
pub use inventory::InventoryService;
pub use lifecycle::{InstallReport, Lifecycle};
pub use prefetch::{PrefetchHandle, PrefetchManager, TaskRegistry};
pub use registry::CacheRegistry;
pub use router::{Route, RouteRule, StrategyRouter};
pub use strategy::StrategyExecutor;
pub use worker::{MediaWorker, MediaWorkerBuilder};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BroadcastBus, CacheError, CacheSummary, ClientMessage, FetchRequest, HttpFetcher,
        MediaWorker, PrefetchReport, PrefetchStatus, Result, WorkerConfig, WorkerEvent,
    };

    #[cfg(feature = "memory")]
    pub use crate::{MemoryConfig, MemoryStorage};
}

#[cfg(test)]
mod testing;
