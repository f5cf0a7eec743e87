//! In-memory bucket storage

mod backend;

pub use backend::{MemoryConfig, MemoryStorage};
