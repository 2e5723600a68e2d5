//! Key/value storage backends.
//!
//! Stores deal in raw strings and report every failure; the [`Cache`](super::Cache)
//! facade decides what a failure means for the caller.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cache backend timed out")]
    Timeout,
    #[error("invalid cache configuration: {0}")]
    Configuration(String),
}

impl CacheError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn del(&self, key: &str) -> Result<(), CacheError>;

    /// Remove every key starting with `prefix`; returns how many were removed.
    async fn clear_prefix(&self, prefix: &str) -> Result<u64, CacheError>;

    fn backend_name(&self) -> &'static str;
}

struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

/// In-process store. Expiry is checked on read; expired entries are dropped lazily.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, MemoryEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Ok(Some(entry.value.clone()));
            }
        } else {
            return Ok(None);
        }

        // Re-check under the write lock so a concurrent refresh is not discarded.
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = Instant::now() + ttl;
        self.entries
            .insert(key.to_string(), MemoryEntry { value, expires_at });
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn clear_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before.saturating_sub(self.entries.len()) as u64)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trips_until_expiry() {
        let store = MemoryStore::new();
        store
            .set("products:list", "[]".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            store.get("products:list").await.unwrap().as_deref(),
            Some("[]")
        );

        store
            .set("products:stale", "[]".to_string(), Duration::ZERO)
            .await
            .unwrap();
        assert!(store.get("products:stale").await.unwrap().is_none());
        assert_eq!(store.len(), 1, "expired entry is removed on read");
    }

    #[tokio::test]
    async fn clear_prefix_only_touches_matching_keys() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);
        for key in ["products:list:a", "products:id:1", "blog:list:a"] {
            store.set(key, "x".to_string(), ttl).await.unwrap();
        }

        let removed = store.clear_prefix("products:").await.unwrap();

        assert_eq!(removed, 2);
        assert!(store.get("products:id:1").await.unwrap().is_none());
        assert!(store.get("blog:list:a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn del_is_a_noop_for_missing_keys() {
        let store = MemoryStore::new();
        store.del("nothing").await.unwrap();
        assert!(store.is_empty());
    }
}
