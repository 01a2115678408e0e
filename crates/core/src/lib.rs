//! Core types and shared functionality for the offline caching engine.
//!
//! This crate provides:
//! - Generation-versioned cache store with SQLite backend
//! - Strategy selection policy
//! - Precache manifest and worker message types
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod manifest;
pub mod message;
pub mod policy;
pub mod request;
pub mod store;

pub use config::WorkerConfig;
pub use error::Error;
pub use manifest::PrecacheManifest;
pub use message::{CacheInfo, WorkerMessage};
pub use policy::{RoutePolicy, StrategyDecision};
pub use request::RequestDescriptor;
pub use store::{CacheEntry, CacheHandle, CacheStore, StoredResponse};
