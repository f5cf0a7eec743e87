//! media-cache-http: HTTP primitives for media-cache
//!
//! Byte-range serving, cacheable-status rules and a `reqwest`-backed
//! [`Fetcher`](media_cache_core::Fetcher).

pub mod fetch;
pub mod policy;
pub mod range;
pub mod response;

pub use fetch::{FetchConfig, HttpFetcher};
pub use policy::CacheableStatuses;
pub use range::{ByteRange, RangeError, serve_range};
pub use response::from_parts;
