//! Declared buckets and their versioned names

use media_cache_core::{BucketKind, BucketSpec, ExpirationPolicy, StrategyKind};

use crate::config::WorkerConfig;

/// The set of buckets owned by one application version
///
/// Exactly one bucket per [`BucketKind`] is current. Names follow
/// `{prefix}-{kind}-{version}`, so every bucket of every version shares the
/// `{prefix}-` identity prefix.
#[derive(Debug, Clone)]
pub struct CacheRegistry {
    prefix: String,
    version: String,
    specs: Vec<BucketSpec>,
}

impl CacheRegistry {
    /// Declare the standard bucket set for a prefix and version
    pub fn new(prefix: impl Into<String>, version: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let version = version.into();
        let specs = BucketKind::ALL
            .iter()
            .map(|&kind| BucketSpec {
                name: BucketSpec::versioned_name(&prefix, kind, &version),
                kind,
                strategy: default_strategy(kind),
                expiration: default_expiration(kind),
            })
            .collect();

        Self {
            prefix,
            version,
            specs,
        }
    }

    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(config.app_prefix.clone(), config.version.clone())
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// All declared buckets, in [`BucketKind::ALL`] order
    pub fn specs(&self) -> &[BucketSpec] {
        &self.specs
    }

    /// The current bucket of a kind
    pub fn spec(&self, kind: BucketKind) -> &BucketSpec {
        // `specs` is built from `BucketKind::ALL`, so the index always matches
        &self.specs[kind as usize]
    }

    /// Current name of a bucket kind
    pub fn name(&self, kind: BucketKind) -> &str {
        &self.spec(kind).name
    }

    /// Look a current bucket up by name
    pub fn by_name(&self, name: &str) -> Option<&BucketSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// Names that survive activation
    pub fn allow_list(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.name.as_str()).collect()
    }

    /// Whether a storage bucket carries this application's identity prefix
    pub fn is_owned(&self, name: &str) -> bool {
        name.strip_prefix(self.prefix.as_str())
            .is_some_and(|rest| rest.starts_with('-'))
    }

    /// Whether a bucket name belongs to the current version
    pub fn is_current(&self, name: &str) -> bool {
        self.by_name(name).is_some()
    }
}

fn default_strategy(kind: BucketKind) -> StrategyKind {
    match kind {
        BucketKind::Pages | BucketKind::Data => StrategyKind::NetworkFirst,
        BucketKind::Static | BucketKind::Images => StrategyKind::StaleWhileRevalidate,
        BucketKind::Media | BucketKind::Fallback => StrategyKind::CacheFirst,
    }
}

fn default_expiration(kind: BucketKind) -> ExpirationPolicy {
    match kind {
        BucketKind::Pages | BucketKind::Fallback => ExpirationPolicy::none(),
        BucketKind::Static => ExpirationPolicy::none().max_entries(80).max_age_days(7),
        BucketKind::Data => ExpirationPolicy::none()
            .max_entries(50)
            .max_age(std::time::Duration::from_secs(5 * 60)),
        BucketKind::Images => ExpirationPolicy::none().max_entries(240).max_age_days(30),
        BucketKind::Media => ExpirationPolicy::none()
            .max_age_days(45)
            .purge_on_quota_error(),
    }
}
