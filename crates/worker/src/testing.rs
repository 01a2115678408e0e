//! Test support: a programmable, counting fetcher.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use swcache_client::{FetchedResponse, Fetcher};
use swcache_core::Error;

enum Outcome {
    Respond { status: u16, body: Vec<u8> },
    Fail,
}

/// In-memory fetcher keyed by exact URL, recording per-URL hit counts.
#[derive(Default)]
pub struct MockFetcher {
    routes: Mutex<HashMap<String, Outcome>>,
    counts: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a 200 response with the given body.
    pub fn ok(&self, url: &str, body: &str) {
        self.ok_with_status(url, 200, body);
    }

    pub fn ok_with_status(&self, url: &str, status: u16, body: &str) {
        self.routes.lock().unwrap().insert(
            url.to_string(),
            Outcome::Respond { status, body: body.as_bytes().to_vec() },
        );
    }

    /// Simulate a transport failure for the given URL.
    pub fn fail(&self, url: &str) {
        self.routes.lock().unwrap().insert(url.to_string(), Outcome::Fail);
    }

    /// Fetch attempts observed for one URL.
    pub fn fetch_count(&self, url: &str) -> usize {
        self.counts.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    /// Fetch attempts observed in total.
    pub fn total_fetches(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, _method: &str, url: &Url) -> Result<FetchedResponse, Error> {
        self.total.fetch_add(1, Ordering::SeqCst);
        *self.counts.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;

        let routes = self.routes.lock().unwrap();
        match routes.get(url.as_str()) {
            Some(Outcome::Respond { status, body }) => Ok(FetchedResponse {
                url: url.clone(),
                status: *status,
                headers: vec![("content-type".into(), "text/html".into())],
                body: Bytes::from(body.clone()),
                fetch_ms: 0,
            }),
            Some(Outcome::Fail) => Err(Error::Network(format!("{url}: connection refused"))),
            None => Err(Error::Network(format!("{url}: no route configured"))),
        }
    }
}
