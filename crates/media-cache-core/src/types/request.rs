//! Outbound/intercepted request description

use std::collections::HashMap;
use url::Url;

/// How the request was initiated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Full page load
    Navigate,
    #[default]
    Cors,
    NoCors,
    SameOrigin,
}

/// Declared destination of the request, as the page would report it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Destination {
    #[default]
    Empty,
    Document,
    Script,
    Style,
    Worker,
    Image,
    Font,
    Audio,
    Video,
}

/// Whether cookies/credentials accompany the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Credentials {
    Omit,
    #[default]
    SameOrigin,
    Include,
}

/// A GET request the engine intercepts or issues
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: Url,
    pub mode: RequestMode,
    pub destination: Destination,
    pub credentials: Credentials,
    /// Lowercase header names
    pub headers: HashMap<String, String>,
}

impl FetchRequest {
    /// Plain subresource request
    pub fn get(url: Url) -> Self {
        Self {
            url,
            mode: RequestMode::default(),
            destination: Destination::default(),
            credentials: Credentials::default(),
            headers: HashMap::new(),
        }
    }

    /// Full page load
    pub fn navigate(url: Url) -> Self {
        Self::get(url)
            .mode(RequestMode::Navigate)
            .destination(Destination::Document)
    }

    pub fn mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Raw `Range` header value, if any
    pub fn range(&self) -> Option<&str> {
        self.get_header("range")
    }

    /// Storage key: the absolute URL without fragment
    pub fn cache_key(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.into()
    }
}
