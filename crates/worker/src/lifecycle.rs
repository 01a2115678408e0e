//! Install/activate lifecycle state machine.
//!
//! The controller owns generation transitions and the client registry;
//! request handling never touches namespaces directly. Install is
//! all-or-nothing: a namespace created by a failed install is discarded,
//! and a failed install leaves any previously working generation untouched,
//! including the same generation on a reinstall.

use std::collections::BTreeSet;
use std::sync::RwLock;

use url::Url;

use swcache_core::store::compute_entry_key;
use swcache_core::{CacheHandle, CacheStore, Error, PrecacheManifest};
use swcache_client::Fetcher;

/// Lifecycle states, in transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Precaching the manifest into the new generation namespace.
    Installing,
    /// Precache complete; waiting to take over request serving.
    Installed,
    /// Evicting stale generations and claiming clients.
    Activating,
    /// Serving requests from the current generation.
    Active,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Installing => write!(f, "installing"),
            Self::Installed => write!(f, "installed"),
            Self::Activating => write!(f, "activating"),
            Self::Active => write!(f, "active"),
        }
    }
}

#[derive(Debug, Default)]
struct ClientRegistry {
    known: BTreeSet<String>,
    controlled: BTreeSet<String>,
}

/// Owns the cache generation transitions and the set of connected clients.
pub struct LifecycleController {
    store: CacheStore,
    generation: String,
    base_url: Url,
    state: RwLock<WorkerState>,
    handle: RwLock<Option<CacheHandle>>,
    clients: RwLock<ClientRegistry>,
}

impl LifecycleController {
    pub fn new(store: CacheStore, generation: impl Into<String>, base_url: Url) -> Self {
        Self {
            store,
            generation: generation.into(),
            base_url,
            state: RwLock::new(WorkerState::Installing),
            handle: RwLock::new(None),
            clients: RwLock::new(ClientRegistry::default()),
        }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read().expect("state lock poisoned")
    }

    fn set_state(&self, next: WorkerState) {
        let mut state = self.state.write().expect("state lock poisoned");
        if *state != next {
            tracing::info!(from = %state, to = %next, generation = %self.generation, "lifecycle transition");
            *state = next;
        }
    }

    pub fn generation(&self) -> &str {
        &self.generation
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The store, for introspection paths that enumerate namespaces.
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Handle to the current generation namespace.
    pub async fn current_handle(&self) -> Result<CacheHandle, Error> {
        if let Some(handle) = self.handle.read().expect("handle lock poisoned").clone() {
            return Ok(handle);
        }

        let handle = self.store.open_generation(&self.generation).await?;
        *self.handle.write().expect("handle lock poisoned") = Some(handle.clone());
        Ok(handle)
    }

    /// Resolve a manifest entry against the worker's origin.
    fn resolve(&self, entry: &str) -> Result<Url, Error> {
        self.base_url
            .join(entry)
            .map_err(|e| Error::InvalidUrl(format!("{entry}: {e}")))
    }

    /// Precache the manifest into the current generation namespace.
    ///
    /// All-or-nothing: every entry must fetch with a success status before
    /// the generation is considered installed. On the first failure the
    /// partial namespace is deleted and the install attempt aborts; prior
    /// generations are never touched here.
    pub async fn on_install(&self, manifest: &PrecacheManifest, fetcher: &dyn Fetcher) -> Result<(), Error> {
        self.set_state(WorkerState::Installing);

        // A reinstall of an existing generation (worker restart with the
        // same id) must not wipe that namespace on failure.
        let preexisting = self.store.list_generations().await?.contains(&self.generation);

        let handle = self.current_handle().await?;

        for entry in manifest.urls() {
            if let Err(err) = self.precache_entry(&handle, fetcher, entry).await {
                tracing::error!(entry, error = %err, generation = %self.generation, "precache failed; aborting install");
                self.discard_install(preexisting).await;
                return Err(Error::Install(format!("precache of {entry} failed: {err}")));
            }
        }

        self.set_state(WorkerState::Installed);
        tracing::info!(generation = %self.generation, entries = manifest.len(), "precache complete");
        Ok(())
    }

    async fn precache_entry(&self, handle: &CacheHandle, fetcher: &dyn Fetcher, entry: &str) -> Result<(), Error> {
        let url = self.resolve(entry)?;
        let response = fetcher.fetch("GET", &url).await?;

        if !response.is_success() {
            return Err(Error::HttpStatus { url: url.to_string(), status: response.status });
        }

        let key = compute_entry_key("GET", url.as_str());
        let stored = response.into_stored();
        handle.put_entry(&key, url.as_str(), "GET", &stored).await
    }

    /// Drop the handle and, when this attempt created the namespace, delete
    /// it. A namespace that predates the attempt stays: it is a working
    /// cache, and a transient install failure must not destroy it.
    async fn discard_install(&self, preexisting: bool) {
        *self.handle.write().expect("handle lock poisoned") = None;
        if preexisting {
            tracing::warn!(generation = %self.generation, "install failed; keeping pre-existing generation");
            return;
        }
        if let Err(err) = self.store.delete_generation(&self.generation).await {
            tracing::warn!(generation = %self.generation, error = %err, "failed to discard partial generation");
        }
    }

    /// Promote this generation: evict every other namespace and claim all
    /// registered clients.
    ///
    /// Eviction is best-effort - a namespace that refuses to delete is
    /// logged and skipped so one stuck deletion cannot block claiming.
    pub async fn on_activate(&self) -> Result<(), Error> {
        self.set_state(WorkerState::Activating);

        // Make sure the namespace exists even when install was skipped
        // (empty manifest deploys).
        self.current_handle().await?;

        let generations = self
            .store
            .list_generations()
            .await
            .map_err(|e| Error::Activation(format!("cannot enumerate generations: {e}")))?;

        for stale in generations.iter().filter(|id| **id != self.generation) {
            match self.store.delete_generation(stale).await {
                Ok(()) => tracing::info!(stale, generation = %self.generation, "deleted stale generation"),
                Err(err) => tracing::warn!(stale, error = %err, "failed to delete stale generation; skipping"),
            }
        }

        let claimed = self.claim_clients();
        self.set_state(WorkerState::Active);
        tracing::info!(generation = %self.generation, claimed, "activation complete");
        Ok(())
    }

    /// Jump an installed-but-waiting worker straight into activation.
    ///
    /// A no-op in any other state.
    pub async fn skip_waiting(&self) -> Result<(), Error> {
        if self.state() != WorkerState::Installed {
            tracing::debug!(state = %self.state(), "skip_waiting ignored");
            return Ok(());
        }
        self.on_activate().await
    }

    /// Record a client connection. Claimed immediately when already active.
    pub fn register_client(&self, id: impl Into<String>) {
        let id = id.into();
        let mut clients = self.clients.write().expect("client lock poisoned");
        if self.state() == WorkerState::Active {
            clients.controlled.insert(id.clone());
        }
        clients.known.insert(id);
    }

    fn claim_clients(&self) -> usize {
        let mut clients = self.clients.write().expect("client lock poisoned");
        clients.controlled = clients.known.clone();
        clients.controlled.len()
    }

    /// Clients currently served by this instance.
    pub fn controlled_clients(&self) -> Vec<String> {
        self.clients
            .read()
            .expect("client lock poisoned")
            .controlled
            .iter()
            .cloned()
            .collect()
    }
}
