//! sw-worker entry point.
//!
//! Boots the caching worker on stdio transport: loads config, opens the
//! store, runs the install/activate lifecycle for the configured generation,
//! then serves host events until stdin closes. Logging goes to stderr to
//! avoid interfering with the JSON lines protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use swcache_client::{FetchConfig, HttpFetcher};
use swcache_core::{CacheStore, PrecacheManifest, WorkerConfig};

mod adapter;
mod engine;
mod fallback;
mod lifecycle;
mod messaging;
mod strategy;
#[cfg(test)]
mod testing;

use engine::CacheEngine;
use lifecycle::LifecycleController;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = WorkerConfig::load().context("failed to load configuration")?;
    tracing::info!(generation = %config.generation, db = %config.db_path.display(), "starting sw-worker");

    let store = CacheStore::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open cache store at {}", config.db_path.display()))?;

    let base_url = config.base_url().context("invalid base_url")?;
    let fetcher = HttpFetcher::new(FetchConfig {
        user_agent: config.user_agent.clone(),
        timeout: config.timeout(),
        ..FetchConfig::default()
    })
    .context("failed to build HTTP client")?;
    let fetcher: Arc<dyn swcache_client::Fetcher> = Arc::new(fetcher);

    let lifecycle = Arc::new(LifecycleController::new(store, &config.generation, base_url));

    let manifest = match &config.manifest_path {
        Some(path) => PrecacheManifest::load(path)
            .with_context(|| format!("failed to load precache manifest {}", path.display()))?,
        None => PrecacheManifest::default(),
    };

    lifecycle
        .on_install(&manifest, fetcher.as_ref())
        .await
        .context("install failed")?;
    lifecycle.on_activate().await.context("activation failed")?;
    tracing::info!(generation = %config.generation, precached = manifest.len(), "worker active");

    let engine = Arc::new(CacheEngine::new(Arc::clone(&lifecycle), Arc::clone(&fetcher), &config));

    let (channel, rx) = messaging::channel();
    tokio::spawn(messaging::run_message_loop(
        Arc::clone(&lifecycle),
        config.info_sample_limit,
        rx,
    ));

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    adapter::run(Arc::clone(&engine), channel, stdin, stdout)
        .await
        .context("host stream failed")?;

    // Host closed stdin: let any background revalidations settle before exit.
    engine.refreshes().await_quiescence().await;

    Ok(())
}
