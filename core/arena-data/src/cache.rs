//! Lifetime-scoped memoisation.
//!
//! Replaces module-level "last known" globals: whoever owns the
//! `Arc<ScopedCache>` decides how long entries live, and invalidation is an
//! explicit call rather than a page reload.

use std::collections::HashMap;
use std::future::Future;
use tokio::sync::RwLock;
use tracing::debug;

/// A keyed cache owned by an explicit scope (a client, a session, a test).
#[derive(Debug)]
pub struct ScopedCache<V> {
    entries: RwLock<HashMap<String, V>>,
}

impl<V: Clone> ScopedCache<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn insert(&self, key: impl Into<String>, value: V) {
        self.entries.write().await.insert(key.into(), value);
    }

    /// Drops one entry. Returns whether it was present.
    pub async fn invalidate(&self, key: &str) -> bool {
        let removed = self.entries.write().await.remove(key).is_some();
        if removed {
            debug!("invalidated cache entry {}", key);
        }
        removed
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Returns the cached value or runs `load` and caches a success.
    ///
    /// Concurrent misses on the same key each run `load`.
    pub async fn get_or_try_load<F, Fut, E>(&self, key: &str, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get(key).await {
            return Ok(hit);
        }
        let value = load().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }
}

impl<V: Clone> Default for ScopedCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
