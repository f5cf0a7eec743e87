use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Owned HTTP response as it is stored in a bucket
///
/// Header names are kept lowercase. Status `0` marks a network error
/// response (the request produced nothing usable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl CachedResponse {
    /// Create new cached response
    pub fn new(status: u16, headers: HashMap<String, String>, body: impl Into<Bytes>) -> Self {
        let headers = headers
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// `200 OK` with the given body and no headers
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(200, HashMap::new(), body)
    }

    /// Empty response with the given status
    pub fn with_status(status: u16) -> Self {
        Self::new(status, HashMap::new(), Bytes::new())
    }

    /// Explicit network error
    pub fn network_error() -> Self {
        Self::with_status(0)
    }

    /// Add or replace a header
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Look up a header (case-insensitive)
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Declared `content-length`, if present and numeric
    pub fn content_length(&self) -> Option<u64> {
        self.get_header("content-length")?.trim().parse().ok()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.get_header("content-type")
    }

    /// 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_network_error(&self) -> bool {
        self.status == 0
    }
}
