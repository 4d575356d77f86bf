// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Intercepted requests and response snapshots.
//!
//! Everything the relay sees from the hosting application is an
//! [`InterceptedRequest`]; everything it hands back is a [`ResponseSnapshot`],
//! whether it came off the wire, out of a cache namespace, or was synthesized
//! locally (queue acknowledgements, offline fallbacks).
//!
//! # Example
//!
//! ```
//! use offline_relay::{InterceptedRequest, ResponseSnapshot};
//!
//! let request = InterceptedRequest::get("https://app.example/index.html").unwrap();
//! assert_eq!(request.identity().as_str(), "GET https://app.example/index.html");
//!
//! let ack = ResponseSnapshot::queued();
//! assert_eq!(ack.status, 202);
//! ```

use bytes::Bytes;
use url::Url;

/// How the hosting application issued the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Top-level page navigation (eligible for the offline document fallback)
    Navigate,
    /// Any other fetch (XHR, image, script, ...)
    #[default]
    Other,
}

/// A network-bound request observed by the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptedRequest {
    pub method: String,
    pub url: Url,
    /// Header pairs in the order the application supplied them
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
    pub mode: RequestMode,
}

/// Methods upper-cased on construction, matching the fetch standard.
/// Anything else is kept byte-for-byte as an extension method.
const NORMALIZED_METHODS: [&str; 6] = ["DELETE", "GET", "HEAD", "OPTIONS", "POST", "PUT"];

fn normalize_method(method: String) -> String {
    match NORMALIZED_METHODS.iter().find(|m| m.eq_ignore_ascii_case(&method)) {
        Some(standard) => (*standard).to_string(),
        None => method,
    }
}

impl InterceptedRequest {
    #[must_use]
    pub fn new(method: impl Into<String>, url: Url) -> Self {
        Self {
            method: normalize_method(method.into()),
            url,
            headers: Vec::new(),
            body: None,
            mode: RequestMode::Other,
        }
    }

    /// Parse `url` and build a plain GET.
    pub fn get(url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new("GET", Url::parse(url)?))
    }

    /// Parse `url` and build a request with an arbitrary method.
    pub fn parse(method: &str, url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(method, Url::parse(url)?))
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Mark this request as a page navigation.
    #[must_use]
    pub fn navigate(mut self) -> Self {
        self.mode = RequestMode::Navigate;
        self
    }

    #[must_use]
    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    #[must_use]
    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    #[must_use]
    pub fn path(&self) -> &str {
        self.url.path()
    }

    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    /// Cache lookup key for this request.
    #[must_use]
    pub fn identity(&self) -> RequestIdentity {
        RequestIdentity::new(&self.method, &self.url)
    }
}

/// Normalized `METHOD url` string used as the cache key.
///
/// The method is upper-cased and the URL fragment dropped; the query string
/// is significant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestIdentity(String);

impl RequestIdentity {
    #[must_use]
    pub fn new(method: &str, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self(format!("{} {}", method.to_ascii_uppercase(), url))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a [`ResponseSnapshot`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
    Synthesized,
}

/// A fully buffered response.
///
/// Bodies are [`Bytes`] so handing a cached snapshot out is a refcount bump,
/// not a copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl ResponseSnapshot {
    /// Build a network-sourced snapshot.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            status_text: String::new(),
            headers: Vec::new(),
            body: body.into(),
            source: ResponseSource::Network,
        }
    }

    fn synthesized(status: u16, status_text: &str, content_type: &str, body: &'static [u8]) -> Self {
        Self {
            status,
            status_text: status_text.to_string(),
            headers: vec![("content-type".to_string(), content_type.to_string())],
            body: Bytes::from_static(body),
            source: ResponseSource::Synthesized,
        }
    }

    /// Acknowledgement for a mutation captured into the offline queue.
    #[must_use]
    pub fn queued() -> Self {
        Self::synthesized(
            202,
            "Accepted",
            "application/json",
            br#"{"queued":true,"offline":true}"#,
        )
    }

    /// Tile miss while the network is unreachable.
    #[must_use]
    pub fn tile_unavailable() -> Self {
        Self::synthesized(408, "Tile unavailable offline", "text/plain", b"Tile unavailable offline")
    }

    /// Nothing cached and no network.
    #[must_use]
    pub fn offline() -> Self {
        Self::synthesized(503, "Offline", "text/plain", b"Offline")
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: ResponseSource) -> Self {
        self.source = source;
        self
    }

    /// First header value matching `name` (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    #[must_use]
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_methods_are_uppercased() {
        let request = InterceptedRequest::parse("post", "https://api.example/reports").unwrap();
        assert_eq!(request.method, "POST");
        let request = InterceptedRequest::parse("Delete", "https://api.example/reports/1").unwrap();
        assert_eq!(request.method, "DELETE");
    }

    #[test]
    fn test_extension_methods_are_kept_verbatim() {
        let request = InterceptedRequest::parse("purge", "https://api.example/cache").unwrap();
        assert_eq!(request.method, "purge");
    }

    #[test]
    fn test_identity_normalizes_method_and_fragment() {
        let request = InterceptedRequest::parse("get", "https://app.example/map?z=3#top").unwrap();
        assert_eq!(request.identity().as_str(), "GET https://app.example/map?z=3");
    }

    #[test]
    fn test_identity_keeps_query_distinct() {
        let a = InterceptedRequest::get("https://tile.example/1/2/3.png?v=1").unwrap();
        let b = InterceptedRequest::get("https://tile.example/1/2/3.png?v=2").unwrap();
        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn test_identity_differs_by_method() {
        let get = InterceptedRequest::parse("GET", "https://api.example/reports").unwrap();
        let post = InterceptedRequest::parse("POST", "https://api.example/reports").unwrap();
        assert_ne!(get.identity(), post.identity());
    }

    #[test]
    fn test_queued_ack_body() {
        let ack = ResponseSnapshot::queued();
        assert_eq!(ack.status, 202);
        assert_eq!(ack.source, ResponseSource::Synthesized);
        assert_eq!(ack.header("Content-Type"), Some("application/json"));

        let body: serde_json::Value = serde_json::from_slice(&ack.body).unwrap();
        assert_eq!(body, serde_json::json!({"queued": true, "offline": true}));
    }

    #[test]
    fn test_synthesized_statuses() {
        assert_eq!(ResponseSnapshot::tile_unavailable().status, 408);
        assert_eq!(ResponseSnapshot::tile_unavailable().status_text, "Tile unavailable offline");
        assert_eq!(ResponseSnapshot::offline().status, 503);
    }

    #[test]
    fn test_status_classes() {
        assert!(ResponseSnapshot::new(204, "").is_success());
        assert!(!ResponseSnapshot::new(304, "").is_success());
        assert!(ResponseSnapshot::new(502, "").is_server_error());
        assert!(!ResponseSnapshot::new(404, "").is_server_error());
    }

    #[test]
    fn test_navigation_flag() {
        let request = InterceptedRequest::get("https://app.example/").unwrap();
        assert!(!request.is_navigation());
        assert!(request.navigate().is_navigation());
    }
}
