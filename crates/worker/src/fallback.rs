//! Offline fallback provider.
//!
//! Consulted only when a navigation request exhausts both the network and
//! the cache: navigations must never surface a raw network error to the
//! user. Sub-resource failures propagate instead.

use url::Url;

use swcache_core::store::compute_entry_key;
use swcache_core::{CacheHandle, StoredResponse};

const OFFLINE_PAGE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Offline</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            height: 100vh;
            margin: 0;
            text-align: center;
        }
        .offline-content { max-width: 400px; padding: 2rem; }
        p { opacity: 0.8; line-height: 1.6; }
    </style>
</head>
<body>
    <div class="offline-content">
        <h1>You are offline</h1>
        <p>The network connection seems to be down, but cached content is
        still available for browsing. Reconnect and reload to get the latest
        version.</p>
    </div>
</body>
</html>
"#;

/// Produce the offline page for a failed navigation.
///
/// Prefers the cached fallback document; synthesizes a minimal 200 HTML
/// response when nothing is cached.
pub async fn offline_page(handle: &CacheHandle, base_url: &Url, fallback_document: &str) -> StoredResponse {
    match base_url.join(fallback_document) {
        Ok(doc_url) => {
            let key = compute_entry_key("GET", doc_url.as_str());
            match handle.match_entry(&key).await {
                Ok(Some(entry)) => return entry.response,
                Ok(None) => {}
                Err(err) => tracing::warn!(url = %doc_url, error = %err, "fallback document lookup failed"),
            }
        }
        Err(err) => tracing::warn!(fallback_document, error = %err, "unresolvable fallback document"),
    }

    synthetic_offline_page()
}

/// The built-in offline page, for when no cached document is reachable.
pub fn synthetic_offline_page() -> StoredResponse {
    StoredResponse {
        status: 200,
        headers: vec![("content-type".into(), "text/html; charset=utf-8".into())],
        body: OFFLINE_PAGE_HTML.as_bytes().to_vec(),
    }
}
