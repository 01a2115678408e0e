//! Versioned response cache backed by SQLite.
//!
//! One logical namespace exists per cache generation; the lifecycle
//! controller rotates namespaces, everything else goes through a
//! generation-scoped [`CacheHandle`]. Uses tokio-rusqlite for async access
//! and WAL mode for concurrent readers.

pub mod connection;
pub mod entries;
pub mod key;
pub mod migrations;

pub use connection::CacheStore;
pub use entries::{CacheEntry, CacheEntrySummary, CacheHandle, StoredResponse};
pub use key::compute_entry_key;
