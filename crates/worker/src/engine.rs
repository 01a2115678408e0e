//! Request-handling engine.
//!
//! Routes every intercepted request through the strategy selector to an
//! executor, and consults the offline fallback when a navigation exhausts
//! both network and cache. The engine knows nothing about the hosting event
//! model; the adapter forwards events to it.

use std::sync::Arc;

use swcache_client::Fetcher;
use swcache_core::{Error, RequestDescriptor, RoutePolicy, StoredResponse, StrategyDecision, WorkerConfig};

use crate::fallback;
use crate::lifecycle::LifecycleController;
use crate::strategy::{self, RefreshTracker};

/// Outcome of handling one intercepted request.
#[derive(Debug)]
pub enum Handled {
    /// The engine produced a response (cached, fetched, or fallback).
    Response(StoredResponse),
    /// Not intercepted; the host passes the request through untouched.
    Bypass,
}

pub struct CacheEngine {
    lifecycle: Arc<LifecycleController>,
    fetcher: Arc<dyn Fetcher>,
    policy: RoutePolicy,
    refreshes: RefreshTracker,
    fallback_document: String,
}

impl CacheEngine {
    pub fn new(lifecycle: Arc<LifecycleController>, fetcher: Arc<dyn Fetcher>, config: &WorkerConfig) -> Self {
        Self {
            lifecycle,
            fetcher,
            policy: config.route_policy(),
            refreshes: RefreshTracker::new(config.max_background_refreshes),
            fallback_document: config.fallback_document.clone(),
        }
    }

    pub fn lifecycle(&self) -> &Arc<LifecycleController> {
        &self.lifecycle
    }

    /// The in-flight background revalidation set.
    pub fn refreshes(&self) -> &RefreshTracker {
        &self.refreshes
    }

    /// Handle one intercepted request.
    ///
    /// Classifies, executes the chosen strategy against the current
    /// generation, and falls back to the offline page for failed
    /// navigations. Non-navigation failures propagate. A store that cannot
    /// produce a handle is never request-fatal: the request degrades to a
    /// direct network fetch.
    pub async fn handle_request(&self, request: &RequestDescriptor) -> Result<Handled, Error> {
        let decision = self.policy.decide(request);
        tracing::debug!(url = %request.url, %decision, navigation = request.navigation, "routing request");

        if decision == StrategyDecision::Bypass {
            return Ok(Handled::Bypass);
        }

        let handle = match self.lifecycle.current_handle().await {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::warn!(url = %request.url, error = %err, "cache unavailable; degrading to network-only");
                None
            }
        };

        let result = match (&handle, decision) {
            (Some(handle), StrategyDecision::CacheFirst) => {
                strategy::cache_first(handle, &self.fetcher, &self.refreshes, request).await
            }
            (Some(handle), StrategyDecision::NetworkFirst) => {
                strategy::network_first(handle, &self.fetcher, request).await
            }
            (Some(_), StrategyDecision::Bypass) => return Ok(Handled::Bypass),
            (None, _) => self
                .fetcher
                .fetch(&request.method, &request.url)
                .await
                .map(|response| response.into_stored()),
        };

        match result {
            Ok(response) => Ok(Handled::Response(response)),
            Err(err) if request.navigation => {
                tracing::warn!(url = %request.url, error = %err, "navigation failed; serving offline page");
                let page = match &handle {
                    Some(handle) => {
                        fallback::offline_page(handle, self.lifecycle.base_url(), &self.fallback_document).await
                    }
                    None => fallback::synthetic_offline_page(),
                };
                Ok(Handled::Response(page))
            }
            Err(err) => Err(err),
        }
    }
}
