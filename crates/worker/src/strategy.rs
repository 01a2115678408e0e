//! Caching strategy executors.
//!
//! Cache-first serves the stored response immediately and revalidates in the
//! background; network-first tries the live fetch and falls back to cache.
//! Cached responses are idempotent representations of the same resource, so
//! same-key writes are last-writer-wins with no locking.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;

use swcache_client::Fetcher;
use swcache_core::{CacheHandle, Error, RequestDescriptor, StoredResponse};

/// Bounded set of in-flight background revalidations.
///
/// Revalidations are detached tasks with no observer; tracking them here
/// lets tests await quiescence instead of sleeping. A full set skips the
/// refresh rather than queueing it.
pub struct RefreshTracker {
    tasks: Mutex<JoinSet<()>>,
    limit: usize,
}

impl RefreshTracker {
    pub fn new(limit: usize) -> Self {
        Self { tasks: Mutex::new(JoinSet::new()), limit }
    }

    /// Spawn a tracked refresh task. Returns false when the set is full.
    pub async fn track<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().await;
        while tasks.try_join_next().is_some() {}

        if tasks.len() >= self.limit {
            return false;
        }
        tasks.spawn(task);
        true
    }

    /// Wait until every tracked refresh has settled.
    pub async fn await_quiescence(&self) {
        let mut tasks = self.tasks.lock().await;
        while tasks.join_next().await.is_some() {}
    }

    /// Refreshes currently in flight (settled tasks are reaped lazily).
    pub async fn in_flight(&self) -> usize {
        let mut tasks = self.tasks.lock().await;
        while tasks.try_join_next().is_some() {}
        tasks.len()
    }
}

/// Serve from cache when possible; refresh in the background.
///
/// On a hit the cached response returns without awaiting any network round
/// trip; exactly one revalidation fetch is issued behind it. On a miss the
/// network response is returned, stored first when it is a success.
/// Transport failures on the miss path propagate to the caller.
pub async fn cache_first(
    handle: &CacheHandle,
    fetcher: &Arc<dyn Fetcher>,
    refreshes: &RefreshTracker,
    request: &RequestDescriptor,
) -> Result<StoredResponse, Error> {
    let key = request.entry_key();

    match handle.match_entry(&key).await {
        Ok(Some(entry)) => {
            tracing::debug!(url = %request.url, "cache hit; revalidating in background");
            spawn_revalidate(handle, fetcher, refreshes, request).await;
            return Ok(entry.response);
        }
        Ok(None) => {}
        // Storage failures are non-fatal: degrade to network-only.
        Err(err) => tracing::warn!(url = %request.url, error = %err, "cache lookup failed"),
    }

    let response = fetcher.fetch(&request.method, &request.url).await?;
    let stored = response.into_stored();

    if stored.is_success()
        && let Err(err) = handle.put_entry(&key, request.url.as_str(), &request.method, &stored).await
    {
        tracing::warn!(url = %request.url, error = %err, "failed to store fetched response");
    }

    Ok(stored)
}

/// Always try the network; fall back to the cached entry on transport
/// failure, or propagate when nothing is cached.
pub async fn network_first(
    handle: &CacheHandle,
    fetcher: &Arc<dyn Fetcher>,
    request: &RequestDescriptor,
) -> Result<StoredResponse, Error> {
    let key = request.entry_key();

    match fetcher.fetch(&request.method, &request.url).await {
        Ok(response) => {
            let stored = response.into_stored();
            if stored.is_success()
                && let Err(err) = handle.put_entry(&key, request.url.as_str(), &request.method, &stored).await
            {
                tracing::warn!(url = %request.url, error = %err, "failed to store fetched response");
            }
            Ok(stored)
        }
        Err(fetch_err) => {
            tracing::debug!(url = %request.url, error = %fetch_err, "network failed; trying cache");
            match handle.match_entry(&key).await {
                Ok(Some(entry)) => Ok(entry.response),
                Ok(None) => Err(fetch_err),
                Err(storage_err) => {
                    tracing::warn!(url = %request.url, error = %storage_err, "cache fallback failed");
                    Err(fetch_err)
                }
            }
        }
    }
}

/// The stale-while-revalidate step behind a cache-first hit: fetch, silently
/// overwrite the entry on success, swallow every failure.
async fn spawn_revalidate(
    handle: &CacheHandle,
    fetcher: &Arc<dyn Fetcher>,
    refreshes: &RefreshTracker,
    request: &RequestDescriptor,
) {
    let handle = handle.clone();
    let fetcher = Arc::clone(fetcher);
    let method = request.method.clone();
    let url = request.url.clone();
    let key = request.entry_key();

    let spawned = refreshes
        .track(async move {
            match fetcher.fetch(&method, &url).await {
                Ok(response) if response.is_success() => {
                    let stored = response.into_stored();
                    match handle.put_entry(&key, url.as_str(), &method, &stored).await {
                        Ok(()) => tracing::debug!(%url, "cache entry refreshed"),
                        Err(err) => tracing::debug!(%url, error = %err, "refresh store failed"),
                    }
                }
                Ok(response) => {
                    tracing::debug!(%url, status = response.status, "refresh got non-success; keeping cached entry");
                }
                Err(err) => tracing::debug!(%url, error = %err, "refresh fetch failed"),
            }
        })
        .await;

    if !spawned {
        tracing::debug!(url = %request.url, "refresh set full; skipping revalidation");
    }
}
