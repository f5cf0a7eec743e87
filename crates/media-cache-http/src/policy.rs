use http::StatusCode;

/// Statuses a strategy is allowed to write into a bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheableStatuses(Vec<u16>);

impl CacheableStatuses {
    /// `200` only (pages, data, images)
    pub fn ok_only() -> Self {
        Self(vec![StatusCode::OK.as_u16()])
    }

    /// `200` and `206` (range-capable media)
    pub fn media() -> Self {
        Self(vec![
            StatusCode::OK.as_u16(),
            StatusCode::PARTIAL_CONTENT.as_u16(),
        ])
    }

    pub fn allows(&self, status: u16) -> bool {
        self.0.contains(&status)
    }
}

impl Default for CacheableStatuses {
    fn default() -> Self {
        Self::ok_only()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_only() {
        let statuses = CacheableStatuses::default();
        assert!(statuses.allows(200));
        assert!(!statuses.allows(206));
        assert!(!statuses.allows(0));
    }

    #[test]
    fn test_media_accepts_partial() {
        let statuses = CacheableStatuses::media();
        assert!(statuses.allows(206));
        assert!(!statuses.allows(404));
    }
}
