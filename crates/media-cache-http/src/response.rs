use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use media_cache_core::CachedResponse;
use std::collections::HashMap;

/// Build a cached response from `http` parts
///
/// Headers whose values are not visible ASCII are dropped.
pub fn from_parts(status: StatusCode, headers: &HeaderMap, body: Bytes) -> CachedResponse {
    let mut headers_map = HashMap::new();
    for (k, v) in headers.iter() {
        if let Ok(s) = v.to_str() {
            headers_map.insert(k.to_string(), s.to_string());
        }
    }
    CachedResponse::new(status.as_u16(), headers_map, body)
}
