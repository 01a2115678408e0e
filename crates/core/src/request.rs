//! Intercepted-request descriptor.

use url::Url;

use crate::store::compute_entry_key;

/// Everything the engine needs to know about one intercepted request.
///
/// Derived per request and consumed once; never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// HTTP method, uppercase.
    pub method: String,
    /// Absolute request URL, already normalized by the caller.
    pub url: Url,
    /// Whether this request represents a top-level page load.
    pub navigation: bool,
}

impl RequestDescriptor {
    pub fn new(method: impl Into<String>, url: Url, navigation: bool) -> Self {
        Self { method: method.into().to_uppercase(), url, navigation }
    }

    /// Cache key for this request within a generation namespace.
    pub fn entry_key(&self) -> String {
        compute_entry_key(&self.method, self.url.as_str())
    }

    /// Whether the request targets an HTTP(S) origin at all.
    pub fn is_http(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn has_query(&self) -> bool {
        self.url.query().is_some_and(|q| !q.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(url: &str) -> RequestDescriptor {
        RequestDescriptor::new("get", Url::parse(url).unwrap(), false)
    }

    #[test]
    fn test_method_uppercased() {
        let req = descriptor("https://example.com/");
        assert_eq!(req.method, "GET");
    }

    #[test]
    fn test_entry_key_matches_hash() {
        let req = descriptor("https://example.com/app.css");
        assert_eq!(req.entry_key(), compute_entry_key("GET", "https://example.com/app.css"));
    }

    #[test]
    fn test_is_http() {
        assert!(descriptor("https://example.com/").is_http());
        assert!(descriptor("http://example.com/").is_http());
        assert!(!descriptor("ws://example.com/").is_http());
        assert!(!descriptor("chrome-extension://abc/page").is_http());
    }

    #[test]
    fn test_has_query() {
        assert!(descriptor("https://example.com/?a=1").has_query());
        assert!(!descriptor("https://example.com/").has_query());
        assert!(!descriptor("https://example.com/?").has_query());
    }
}
