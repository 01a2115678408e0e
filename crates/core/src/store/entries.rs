//! Generation-scoped entry operations.
//!
//! All reads and writes go through a [`CacheHandle`] scoped to one
//! generation namespace; only the lifecycle controller enumerates or deletes
//! whole namespaces via the store-level operations.

use super::connection::CacheStore;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A response as held by the cache: status, headers and body preserved
/// unmodified from the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl StoredResponse {
    /// Whether the status code indicates success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value with the given name, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A cached entry: request key, origin request metadata, stored response,
/// and storage timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub url: String,
    pub method: String,
    pub response: StoredResponse,
    pub stored_at: String,
}

/// Capped per-entry summary returned by cache introspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntrySummary {
    pub url: String,
    pub size: u64,
    pub stored_at: String,
}

/// Handle scoped to one generation namespace.
///
/// Cheap to clone; all clones share the underlying connection.
#[derive(Clone, Debug)]
pub struct CacheHandle {
    store: CacheStore,
    generation: String,
}

impl CacheStore {
    /// Open a generation namespace, creating it if absent. Idempotent.
    pub async fn open_generation(&self, id: &str) -> Result<CacheHandle, Error> {
        let generation = id.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let gen_for_insert = generation.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (id, created_at) VALUES (?1, ?2)",
                    params![gen_for_insert, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(CacheHandle { store: self.clone(), generation })
    }

    /// All generation namespace ids currently present.
    pub async fn list_generations(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT id FROM generations ORDER BY created_at, id")?;
                let ids = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ids)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation namespace and every entry in it.
    pub async fn delete_generation(&self, id: &str) -> Result<(), Error> {
        let id = id.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM entries WHERE generation = ?1", params![id])?;
                conn.execute("DELETE FROM generations WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

impl CacheHandle {
    /// The namespace id this handle is scoped to.
    pub fn generation(&self) -> &str {
        &self.generation
    }

    /// Look up an entry by request key.
    ///
    /// Returns None on a cache miss.
    pub async fn match_entry(&self, key: &str) -> Result<Option<CacheEntry>, Error> {
        let generation = self.generation.clone();
        let key = key.to_string();
        self.store
            .conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key, url, method, status, headers_json, body, stored_at
                     FROM entries WHERE generation = ?1 AND key = ?2",
                )?;

                let result = stmt.query_row(params![generation, key], |row| {
                    let headers_json: String = row.get(4)?;
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, u16>(3)?,
                        headers_json,
                        row.get::<_, Vec<u8>>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                });

                match result {
                    Ok((key, url, method, status, headers_json, body, stored_at)) => {
                        let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)
                            .map_err(|e| Error::InvalidInput(format!("corrupt headers for {url}: {e}")))?;
                        Ok(Some(CacheEntry {
                            key,
                            url,
                            method,
                            response: StoredResponse { status, headers, body },
                            stored_at,
                        }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or overwrite an entry.
    ///
    /// Uses UPSERT semantics and refreshes the storage timestamp, so
    /// revalidation of an existing key never duplicates it. Callers treat a
    /// failure here as non-fatal: caching is best-effort.
    pub async fn put_entry(
        &self,
        key: &str,
        url: &str,
        method: &str,
        response: &StoredResponse,
    ) -> Result<(), Error> {
        let generation = self.generation.clone();
        let key = key.to_string();
        let url = url.to_string();
        let method = method.to_string();
        let status = response.status;
        let headers_json = serde_json::to_string(&response.headers)
            .map_err(|e| Error::InvalidInput(format!("unserializable headers: {e}")))?;
        let body = response.body.clone();
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.store
            .conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (generation, key, url, method, status, headers_json, body, stored_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(generation, key) DO UPDATE SET
                        url = excluded.url,
                        method = excluded.method,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![generation, key, url, method, status, headers_json, body, stored_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete an entry by key. Returns whether an entry existed.
    pub async fn delete_entry(&self, key: &str) -> Result<bool, Error> {
        let generation = self.generation.clone();
        let key = key.to_string();
        self.store
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE generation = ?1 AND key = ?2",
                    params![generation, key],
                )?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in this namespace.
    pub async fn entry_count(&self) -> Result<u64, Error> {
        let generation = self.generation.clone();
        self.store
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE generation = ?1",
                    params![generation],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Approximate total body bytes held in this namespace.
    pub async fn total_size(&self) -> Result<u64, Error> {
        let generation = self.generation.clone();
        self.store
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let size: i64 = conn.query_row(
                    "SELECT COALESCE(SUM(LENGTH(body)), 0) FROM entries WHERE generation = ?1",
                    params![generation],
                    |row| row.get(0),
                )?;
                Ok(size as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// A capped sample of entries, oldest first.
    pub async fn sample(&self, limit: usize) -> Result<Vec<CacheEntrySummary>, Error> {
        let generation = self.generation.clone();
        let limit = limit as i64;
        self.store
            .conn
            .call(move |conn| -> Result<Vec<CacheEntrySummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, LENGTH(body), stored_at FROM entries
                     WHERE generation = ?1 ORDER BY stored_at, url LIMIT ?2",
                )?;
                let rows = stmt
                    .query_map(params![generation, limit], |row| {
                        Ok(CacheEntrySummary {
                            url: row.get(0)?,
                            size: row.get::<_, i64>(1)? as u64,
                            stored_at: row.get(2)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::key::compute_entry_key;

    fn response(body: &str) -> StoredResponse {
        StoredResponse {
            status: 200,
            headers: vec![("content-type".into(), "text/html".into())],
            body: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let store = CacheStore::open_in_memory().await.unwrap();
        let handle = store.open_generation("v1").await.unwrap();

        let key = compute_entry_key("GET", "https://example.com/");
        handle
            .put_entry(&key, "https://example.com/", "GET", &response("<html>"))
            .await
            .unwrap();

        let entry = handle.match_entry(&key).await.unwrap().unwrap();
        assert_eq!(entry.url, "https://example.com/");
        assert_eq!(entry.response.status, 200);
        assert_eq!(entry.response.body, b"<html>");
        assert_eq!(entry.response.header("Content-Type"), Some("text/html"));
    }

    #[tokio::test]
    async fn test_match_missing() {
        let store = CacheStore::open_in_memory().await.unwrap();
        let handle = store.open_generation("v1").await.unwrap();
        let result = handle.match_entry("nonexistent").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = CacheStore::open_in_memory().await.unwrap();
        let handle = store.open_generation("v1").await.unwrap();

        let key = compute_entry_key("GET", "https://example.com/app.css");
        handle
            .put_entry(&key, "https://example.com/app.css", "GET", &response("old"))
            .await
            .unwrap();
        handle
            .put_entry(&key, "https://example.com/app.css", "GET", &response("new"))
            .await
            .unwrap();

        assert_eq!(handle.entry_count().await.unwrap(), 1);
        let entry = handle.match_entry(&key).await.unwrap().unwrap();
        assert_eq!(entry.response.body, b"new");
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let store = CacheStore::open_in_memory().await.unwrap();
        let v1 = store.open_generation("v1").await.unwrap();
        let v2 = store.open_generation("v2").await.unwrap();

        let key = compute_entry_key("GET", "https://example.com/");
        v1.put_entry(&key, "https://example.com/", "GET", &response("v1"))
            .await
            .unwrap();

        assert!(v2.match_entry(&key).await.unwrap().is_none());
        assert_eq!(v2.entry_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_open_generation_idempotent() {
        let store = CacheStore::open_in_memory().await.unwrap();
        store.open_generation("v1").await.unwrap();
        store.open_generation("v1").await.unwrap();
        assert_eq!(store.list_generations().await.unwrap(), vec!["v1".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_generation_is_listed() {
        let store = CacheStore::open_in_memory().await.unwrap();
        store.open_generation("v1").await.unwrap();
        let generations = store.list_generations().await.unwrap();
        assert_eq!(generations, vec!["v1".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_generation() {
        let store = CacheStore::open_in_memory().await.unwrap();
        let v1 = store.open_generation("v1").await.unwrap();
        store.open_generation("v2").await.unwrap();

        let key = compute_entry_key("GET", "https://example.com/");
        v1.put_entry(&key, "https://example.com/", "GET", &response("v1"))
            .await
            .unwrap();

        store.delete_generation("v1").await.unwrap();

        assert_eq!(store.list_generations().await.unwrap(), vec!["v2".to_string()]);
        assert!(v1.match_entry(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let store = CacheStore::open_in_memory().await.unwrap();
        let handle = store.open_generation("v1").await.unwrap();

        let key = compute_entry_key("GET", "https://example.com/");
        handle
            .put_entry(&key, "https://example.com/", "GET", &response("x"))
            .await
            .unwrap();

        assert!(handle.delete_entry(&key).await.unwrap());
        assert!(!handle.delete_entry(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_size_and_sample() {
        let store = CacheStore::open_in_memory().await.unwrap();
        let handle = store.open_generation("v1").await.unwrap();

        for (i, url) in ["https://example.com/a", "https://example.com/b"].iter().enumerate() {
            let key = compute_entry_key("GET", url);
            let body = "x".repeat(10 * (i + 1));
            handle.put_entry(&key, url, "GET", &response(&body)).await.unwrap();
        }

        assert_eq!(handle.total_size().await.unwrap(), 30);

        let sample = handle.sample(1).await.unwrap();
        assert_eq!(sample.len(), 1);
        assert_eq!(sample[0].size, 10);
    }
}
