//! Precache manifest.
//!
//! The ordered list of URLs fetched and stored at install time, supplied at
//! build time as a JSON array. Treated as immutable input: install either
//! stores every entry or aborts.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Ordered list of URLs guaranteed fetchable at install time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrecacheManifest {
    urls: Vec<String>,
}

impl PrecacheManifest {
    /// Build a manifest from an ordered list of URLs.
    pub fn new(urls: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { urls: urls.into_iter().map(Into::into).collect() }
    }

    /// Load a manifest from a JSON array file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::InvalidInput(format!("cannot read manifest {}: {e}", path.as_ref().display())))?;
        serde_json::from_str(&raw).map_err(|e| Error::InvalidInput(format!("malformed manifest: {e}")))
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
