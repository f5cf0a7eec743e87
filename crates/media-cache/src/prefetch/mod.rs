//! Background prefetch tasks

mod manager;
mod registry;
mod task;

pub use manager::{PrefetchHandle, PrefetchManager, SINGLE_LABEL};
pub use registry::TaskRegistry;
pub use task::{TaskCell, TaskPhase};
