//! Worker messaging types.
//!
//! Clients talk to the worker over an mpsc channel. `SkipWaiting` is
//! fire-and-forget; `GetCacheInfo` carries a dedicated oneshot reply port so
//! each request correlates with exactly one response.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::store::CacheEntrySummary;

/// A message sent to the worker.
#[derive(Debug)]
pub enum WorkerMessage {
    /// Force an installed-but-waiting worker straight into activation.
    SkipWaiting,
    /// Request a cache introspection snapshot on the given reply port.
    GetCacheInfo { reply: oneshot::Sender<CacheInfo> },
}

/// Cache introspection snapshot returned for `GetCacheInfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheInfo {
    /// Active generation namespace id.
    pub generation: String,
    /// Number of entries in the active namespace.
    pub entry_count: u64,
    /// Approximate total body bytes.
    pub total_size: u64,
    /// Capped sample of entries.
    pub entries: Vec<CacheEntrySummary>,
}
