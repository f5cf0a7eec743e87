//! media-cache-core: Core traits and types for the media-cache engine
//!
//! This crate provides the bucket model, the wire protocol spoken with
//! observers, and the seams (storage, network, event bus, metrics) the
//! engine is built against.

mod error;
mod protocol;
mod traits;
mod types;

pub use error::{CacheError, Result};
pub use protocol::{ClientMessage, WorkerEvent};
pub use traits::*;
pub use types::*;
