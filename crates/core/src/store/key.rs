//! Request-key generation.
//!
//! A cache entry is addressed by the hash of its method plus normalized
//! absolute URL; uniqueness is enforced per generation namespace by the
//! store's composite primary key.

use sha2::{Digest, Sha256};

/// Compute the cache key for a request.
pub fn compute_entry_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
