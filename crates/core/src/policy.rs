//! Strategy selection.
//!
//! Pure classification of a request descriptor into a caching strategy. The
//! routing table (API prefixes, dynamic-document routes, static extension
//! allow-list) is data, not code, so deployments can reshape it through
//! configuration instead of editing match arms.

use serde::{Deserialize, Serialize};

use crate::request::RequestDescriptor;

/// The strategy chosen for a request. First matching rule wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyDecision {
    /// Not intercepted at all (non-HTTP(S) scheme); the host passes the
    /// request through untouched.
    Bypass,
    /// Serve from cache when possible, refresh in the background.
    CacheFirst,
    /// Always try the network, fall back to cache.
    NetworkFirst,
}

impl std::fmt::Display for StrategyDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bypass => write!(f, "bypass"),
            Self::CacheFirst => write!(f, "cache-first"),
            Self::NetworkFirst => write!(f, "network-first"),
        }
    }
}

/// A path rule marking documents as dynamic (always network-first when
/// loaded as a navigation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicRoute {
    /// Substring the path must contain.
    pub contains: String,
    /// Suffix the path must additionally end with, if any.
    #[serde(default)]
    pub ends_with: Option<String>,
}

impl DynamicRoute {
    pub fn matches(&self, path: &str) -> bool {
        path.contains(&self.contains)
            && self
                .ends_with
                .as_deref()
                .is_none_or(|suffix| path.ends_with(suffix))
    }
}

/// Configurable routing table for strategy selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePolicy {
    /// Path prefixes served by the API; dynamic content.
    pub api_prefixes: Vec<String>,
    /// Document routes whose content changes between deploys.
    pub dynamic_routes: Vec<DynamicRoute>,
    /// File extensions safe to serve stale (versioned by filename).
    pub static_extensions: Vec<String>,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self {
            api_prefixes: vec!["/api/".into()],
            dynamic_routes: vec![DynamicRoute { contains: "/ppt/".into(), ends_with: Some(".html".into()) }],
            static_extensions: [
                "css", "js", "png", "jpg", "jpeg", "gif", "webp", "svg", "ico", "woff", "woff2", "ttf", "eot",
                "mp4", "webm", "ogg", "mp3", "wav",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl RoutePolicy {
    /// Classify a request. Precedence, first match wins:
    ///
    /// 1. Non-HTTP(S) scheme: bypass.
    /// 2. Navigation-mode request for dynamic content (query string, API
    ///    prefix, or a configured dynamic route): network-first.
    /// 3. Static-asset extension: cache-first.
    /// 4. Everything else: cache-first with network fallback.
    pub fn decide(&self, request: &RequestDescriptor) -> StrategyDecision {
        if !request.is_http() {
            return StrategyDecision::Bypass;
        }

        if request.navigation && self.is_dynamic(request) {
            return StrategyDecision::NetworkFirst;
        }

        // Rules 3 and 4 both resolve to cache-first; the distinction only
        // matters for logging.
        StrategyDecision::CacheFirst
    }

    /// Whether the request targets content that must reflect the latest
    /// server state whenever reachable.
    fn is_dynamic(&self, request: &RequestDescriptor) -> bool {
        if request.has_query() {
            return true;
        }
        let path = request.path();
        self.api_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
            || self.dynamic_routes.iter().any(|route| route.matches(path))
    }

    /// Whether the path's extension is in the static-asset allow-list.
    pub fn is_static_asset(&self, path: &str) -> bool {
        path.rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .is_some_and(|ext| self.static_extensions.iter().any(|allowed| *allowed == ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn request(url: &str, navigation: bool) -> RequestDescriptor {
        RequestDescriptor::new("GET", Url::parse(url).unwrap(), navigation)
    }

    #[test]
    fn test_non_http_bypassed() {
        let policy = RoutePolicy::default();
        assert_eq!(policy.decide(&request("ws://example.com/socket", false)), StrategyDecision::Bypass);
        assert_eq!(
            policy.decide(&request("chrome-extension://abc/page.html", true)),
            StrategyDecision::Bypass
        );
    }

    #[test]
    fn test_navigation_with_query_is_network_first() {
        let policy = RoutePolicy::default();
        let req = request("https://example.com/page?draft=1", true);
        assert_eq!(policy.decide(&req), StrategyDecision::NetworkFirst);
    }

    #[test]
    fn test_api_navigation_is_network_first() {
        let policy = RoutePolicy::default();
        let req = request("https://example.com/api/status", true);
        assert_eq!(policy.decide(&req), StrategyDecision::NetworkFirst);
    }

    #[test]
    fn test_dynamic_route_is_network_first() {
        let policy = RoutePolicy::default();
        let req = request("https://example.com/ppt/deck.html", true);
        assert_eq!(policy.decide(&req), StrategyDecision::NetworkFirst);
    }

    #[test]
    fn test_dynamic_route_suffix_must_match() {
        let policy = RoutePolicy::default();
        let req = request("https://example.com/ppt/deck.png", true);
        assert_eq!(policy.decide(&req), StrategyDecision::CacheFirst);
    }

    #[test]
    fn test_subresource_query_stays_cache_first() {
        // Dynamic-content rules only apply to navigations.
        let policy = RoutePolicy::default();
        let req = request("https://example.com/app.js?v=3", false);
        assert_eq!(policy.decide(&req), StrategyDecision::CacheFirst);
    }

    #[test]
    fn test_static_asset_is_cache_first() {
        let policy = RoutePolicy::default();
        let req = request("https://example.com/styles/globals.css", false);
        assert_eq!(policy.decide(&req), StrategyDecision::CacheFirst);
        assert!(policy.is_static_asset("/styles/globals.css"));
    }

    #[test]
    fn test_default_is_cache_first() {
        let policy = RoutePolicy::default();
        let req = request("https://example.com/about", true);
        assert_eq!(policy.decide(&req), StrategyDecision::CacheFirst);
    }

    #[test]
    fn test_static_extension_case_insensitive() {
        let policy = RoutePolicy::default();
        assert!(policy.is_static_asset("/logo.PNG"));
        assert!(!policy.is_static_asset("/page.html"));
        assert!(!policy.is_static_asset("/no-extension"));
    }

    #[test]
    fn test_custom_api_prefix() {
        let policy = RoutePolicy { api_prefixes: vec!["/graphql".into()], ..Default::default() };
        let req = request("https://example.com/graphql", true);
        assert_eq!(policy.decide(&req), StrategyDecision::NetworkFirst);

        let default_api = request("https://example.com/api/x", true);
        assert_eq!(policy.decide(&default_api), StrategyDecision::CacheFirst);
    }
}
