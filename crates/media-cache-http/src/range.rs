//! Byte-range requests against cached responses

use media_cache_core::CachedResponse;

/// Range header could not be honored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    /// Not of the form `bytes=a-b`, or several ranges
    Malformed(String),
    /// Outside of the body
    Unsatisfiable { size: u64 },
}

impl std::fmt::Display for RangeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RangeError::Malformed(h) => write!(f, "malformed range header: {}", h),
            RangeError::Unsatisfiable { size } => {
                write!(f, "range not satisfiable for {} bytes", size)
            }
        }
    }
}

impl std::error::Error for RangeError {}

/// Requested byte range as written in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// `bytes=start-end` (inclusive)
    Bounded(u64, u64),
    /// `bytes=start-`
    From(u64),
    /// `bytes=-n`: the last `n` bytes
    Suffix(u64),
}

impl ByteRange {
    /// Parse a single-range `Range` header value
    pub fn parse(header: &str) -> Result<Self, RangeError> {
        let malformed = || RangeError::Malformed(header.to_string());
        let spec = header
            .trim()
            .strip_prefix("bytes=")
            .ok_or_else(malformed)?
            .trim();
        if spec.contains(',') {
            return Err(malformed());
        }
        let (start, end) = spec.split_once('-').ok_or_else(malformed)?;
        let (start, end) = (start.trim(), end.trim());

        match (start.is_empty(), end.is_empty()) {
            (true, true) => Err(malformed()),
            (true, false) => end.parse().map(ByteRange::Suffix).map_err(|_| malformed()),
            (false, true) => start.parse().map(ByteRange::From).map_err(|_| malformed()),
            (false, false) => {
                let s: u64 = start.parse().map_err(|_| malformed())?;
                let e: u64 = end.parse().map_err(|_| malformed())?;
                if e < s {
                    return Err(malformed());
                }
                Ok(ByteRange::Bounded(s, e))
            }
        }
    }

    /// Resolve to inclusive `(start, end)` offsets within `size` bytes
    pub fn resolve(&self, size: u64) -> Result<(u64, u64), RangeError> {
        let unsatisfiable = RangeError::Unsatisfiable { size };
        if size == 0 {
            return Err(unsatisfiable);
        }
        match *self {
            ByteRange::Bounded(s, e) if s < size => Ok((s, e.min(size - 1))),
            ByteRange::From(s) if s < size => Ok((s, size - 1)),
            ByteRange::Suffix(n) if n > 0 => Ok((size.saturating_sub(n), size - 1)),
            _ => Err(unsatisfiable),
        }
    }
}

/// Answer a `Range` request from a full cached response
///
/// Produces `206 Partial Content` with a sliced body, or `416` when the
/// header is malformed or outside the body. A response that is already
/// partial is returned untouched.
pub fn serve_range(full: &CachedResponse, range_header: &str) -> CachedResponse {
    if full.status == 206 {
        return full.clone();
    }
    let size = full.body.len() as u64;

    let resolved = ByteRange::parse(range_header).and_then(|r| r.resolve(size));
    match resolved {
        Ok((start, end)) => {
            let body = full.body.slice(start as usize..=end as usize);
            let mut partial = CachedResponse::new(206, full.headers.clone(), body)
                .header("content-range", format!("bytes {}-{}/{}", start, end, size))
                .header("content-length", (end - start + 1).to_string());
            if let Some(ct) = full.content_type() {
                partial = partial.header("content-type", ct.to_string());
            }
            partial
        }
        Err(err) => {
            tracing::debug!(target: "media_cache", error = %err, "range request rejected");
            CachedResponse::with_status(416).header("content-range", format!("bytes */{}", size))
        }
    }
}
