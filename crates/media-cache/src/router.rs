//! Request classification
//!
//! Rules are evaluated top to bottom and the first match wins:
//!
//! | rule | matches | strategy | bucket |
//! |------|---------|----------|--------|
//! | navigation | navigate mode or document destination | network-first (8s) | pages |
//! | static asset | script, style, worker | stale-while-revalidate | static |
//! | image | image destination | stale-while-revalidate | images |
//! | data | `/api/`, `*.json`, `/data/` | network-first (6s) | data |
//! | media | audio/video destination, media extension, media host | cache-first | media |
//! | default | everything else | stale-while-revalidate | static |

use std::time::Duration;

use media_cache_core::{BucketKind, Destination, FetchRequest, RequestMode, StrategyKind};

use crate::config::WorkerConfig;

const MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "webm", "mov", "m4v", "mkv", "mp3", "wav", "ogg", "m4a", "aac", "flac",
];

/// Which routing rule matched a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteRule {
    Navigation,
    StaticAsset,
    Image,
    Data,
    Media,
    Default,
}

/// Outcome of routing one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub rule: RouteRule,
    pub bucket: BucketKind,
    pub strategy: StrategyKind,
    /// Network wait before falling back to cache (network-first only)
    pub network_timeout: Option<Duration>,
}

impl Route {
    /// Serve `Range` requests by slicing cached bodies
    pub fn serves_ranges(&self) -> bool {
        self.bucket == BucketKind::Media
    }

    /// Fall back to the pre-warmed pages when nothing else is available
    pub fn uses_offline_fallback(&self) -> bool {
        self.rule == RouteRule::Navigation
    }

    /// Broadcast a freshness notice after background revalidation
    pub fn broadcasts_updates(&self) -> bool {
        self.bucket == BucketKind::Static
    }
}

/// Maps requests to a bucket and strategy
#[derive(Debug, Clone)]
pub struct StrategyRouter {
    navigation_timeout: Duration,
    data_timeout: Duration,
    media_hosts: Vec<String>,
}

impl StrategyRouter {
    pub fn new(config: &WorkerConfig) -> Self {
        Self {
            navigation_timeout: config.navigation_timeout,
            data_timeout: config.data_timeout,
            media_hosts: config
                .media_hosts
                .iter()
                .map(|h| h.to_ascii_lowercase())
                .collect(),
        }
    }

    /// Classify a request
    pub fn route(&self, request: &FetchRequest) -> Route {
        let route = if is_navigation(request) {
            Route {
                rule: RouteRule::Navigation,
                bucket: BucketKind::Pages,
                strategy: StrategyKind::NetworkFirst,
                network_timeout: Some(self.navigation_timeout),
            }
        } else if matches!(
            request.destination,
            Destination::Script | Destination::Style | Destination::Worker
        ) {
            swr(RouteRule::StaticAsset, BucketKind::Static)
        } else if request.destination == Destination::Image {
            swr(RouteRule::Image, BucketKind::Images)
        } else if is_data(request) {
            Route {
                rule: RouteRule::Data,
                bucket: BucketKind::Data,
                strategy: StrategyKind::NetworkFirst,
                network_timeout: Some(self.data_timeout),
            }
        } else if self.is_media(request) {
            Route {
                rule: RouteRule::Media,
                bucket: BucketKind::Media,
                strategy: StrategyKind::CacheFirst,
                network_timeout: None,
            }
        } else {
            swr(RouteRule::Default, BucketKind::Static)
        };

        tracing::debug!(
            target: "media_cache",
            url = %request.url,
            rule = ?route.rule,
            bucket = %route.bucket,
            strategy = route.strategy.as_str(),
            "routed"
        );
        route
    }

    /// Audio/video by destination, file extension or host
    pub fn is_media(&self, request: &FetchRequest) -> bool {
        if matches!(request.destination, Destination::Audio | Destination::Video) {
            return true;
        }
        if has_media_extension(request.url.path()) {
            return true;
        }
        request.url.host_str().is_some_and(|host| {
            let host = host.to_ascii_lowercase();
            self.media_hosts
                .iter()
                .any(|suffix| host == *suffix || host.ends_with(&format!(".{}", suffix)))
        })
    }
}

fn swr(rule: RouteRule, bucket: BucketKind) -> Route {
    Route {
        rule,
        bucket,
        strategy: StrategyKind::StaleWhileRevalidate,
        network_timeout: None,
    }
}

fn is_navigation(request: &FetchRequest) -> bool {
    request.mode == RequestMode::Navigate || request.destination == Destination::Document
}

fn is_data(request: &FetchRequest) -> bool {
    let path = request.url.path();
    path.starts_with("/api/") || path.ends_with(".json") || path.contains("/data/")
}

fn has_media_extension(path: &str) -> bool {
    let file = path.rsplit('/').next().unwrap_or_default();
    file.rsplit_once('.').is_some_and(|(_, ext)| {
        MEDIA_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn router() -> StrategyRouter {
        StrategyRouter::new(&WorkerConfig::from_scope("https://host/").unwrap())
    }

    fn get(url: &str) -> FetchRequest {
        FetchRequest::get(Url::parse(url).unwrap())
    }

    #[test]
    fn test_navigation() {
        let route = router().route(&FetchRequest::navigate(
            Url::parse("https://host/workouts/").unwrap(),
        ));
        assert_eq!(route.rule, RouteRule::Navigation);
        assert_eq!(route.bucket, BucketKind::Pages);
        assert_eq!(route.strategy, StrategyKind::NetworkFirst);
        assert_eq!(route.network_timeout, Some(Duration::from_secs(8)));
        assert!(route.uses_offline_fallback());
    }

    #[test]
    fn test_navigation_wins_over_media_extension() {
        let route = router().route(&FetchRequest::navigate(
            Url::parse("https://host/clip.mp4").unwrap(),
        ));
        assert_eq!(route.rule, RouteRule::Navigation);
    }

    #[test]
    fn test_static_assets() {
        let r = router();
        for dest in [Destination::Script, Destination::Style, Destination::Worker] {
            let route = r.route(&get("https://host/app.js").destination(dest));
            assert_eq!(route.rule, RouteRule::StaticAsset);
            assert_eq!(route.bucket, BucketKind::Static);
            assert_eq!(route.strategy, StrategyKind::StaleWhileRevalidate);
            assert!(route.broadcasts_updates());
        }
    }

    #[test]
    fn test_images() {
        let route = router().route(&get("https://host/a.png").destination(Destination::Image));
        assert_eq!(route.bucket, BucketKind::Images);
        assert_eq!(route.strategy, StrategyKind::StaleWhileRevalidate);
        assert!(!route.broadcasts_updates());
    }

    #[test]
    fn test_data_endpoints() {
        let r = router();
        for url in [
            "https://host/api/sessions",
            "https://host/manifest.json",
            "https://host/content/data/list",
        ] {
            let route = r.route(&get(url));
            assert_eq!(route.rule, RouteRule::Data, "{url}");
            assert_eq!(route.network_timeout, Some(Duration::from_secs(6)));
        }
    }

    #[test]
    fn test_media() {
        let r = router();
        for req in [
            get("https://host/videos/a.mp4"),
            get("https://host/sounds/beep.MP3"),
            get("https://host/stream").destination(Destination::Video),
            get("https://host/stream").destination(Destination::Audio),
            get("https://pub-123.r2.dev/clip"),
            get("https://bucket.fra1.digitaloceanspaces.com/clip"),
        ] {
            let route = r.route(&req);
            assert_eq!(route.rule, RouteRule::Media, "{}", req.url);
            assert_eq!(route.strategy, StrategyKind::CacheFirst);
            assert!(route.serves_ranges());
        }
    }

    #[test]
    fn test_media_host_requires_label_boundary() {
        assert!(!router().is_media(&get("https://notr2.dev/clip")));
    }

    #[test]
    fn test_default() {
        let route = router().route(&get("https://host/favicon.ico"));
        assert_eq!(route.rule, RouteRule::Default);
        assert_eq!(route.bucket, BucketKind::Static);
        assert_eq!(route.strategy, StrategyKind::StaleWhileRevalidate);
    }
}
