//! Namespaced, typed cache facade.
//!
//! Backend failures never reach callers: they are logged, counted and
//! treated as misses (reads) or skipped (writes and invalidations).

use std::{future::Future, sync::Arc, time::Duration};

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use super::{
    config::CacheConfig,
    redis::RedisStore,
    store::{CacheError, CacheStore, MemoryStore},
};

pub(crate) const METRIC_CACHE_LOOKUPS: &str = "shopfront_cache_lookups_total";
pub(crate) const METRIC_CACHE_ERRORS: &str = "shopfront_cache_errors_total";
pub(crate) const METRIC_CACHE_INVALIDATIONS: &str = "shopfront_cache_invalidations_total";

#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
    namespace: String,
    default_ttl: Duration,
}

impl Cache {
    pub fn new(
        store: Arc<dyn CacheStore>,
        namespace: impl Into<String>,
        default_ttl: Duration,
    ) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            default_ttl,
        }
    }

    /// In-process cache with default settings.
    pub fn in_memory() -> Self {
        let config = CacheConfig::default();
        Self::new(
            Arc::new(MemoryStore::new()),
            config.namespace,
            config.default_ttl,
        )
    }

    /// Picks Redis when a URL is configured, the in-process store otherwise.
    pub fn from_config(config: &CacheConfig) -> Result<Self, CacheError> {
        let store: Arc<dyn CacheStore> = match config.redis_url.as_deref() {
            Some(url) => Arc::new(RedisStore::new(url, config.redis_timeout)?),
            None => Arc::new(MemoryStore::new()),
        };
        Ok(Self::new(store, config.namespace.clone(), config.default_ttl))
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{key}", self.namespace)
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        match self.store.get(&self.key(key)).await {
            Ok(Some(value)) => {
                record_lookup("hit");
                Some(value)
            }
            Ok(None) => {
                record_lookup("miss");
                None
            }
            Err(err) => {
                self.degrade("get", key, &err);
                record_lookup("miss");
                None
            }
        }
    }

    /// Stores `value` for `ttl`, or the default TTL when `None`.
    pub async fn set(&self, key: &str, value: String, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        if let Err(err) = self.store.set(&self.key(key), value, ttl).await {
            self.degrade("set", key, &err);
        }
    }

    pub async fn del(&self, key: &str) {
        if let Err(err) = self.store.del(&self.key(key)).await {
            self.degrade("del", key, &err);
        }
    }

    /// Removes every entry under `prefix`; returns 0 when the backend failed.
    pub async fn clear_prefix(&self, prefix: &str) -> u64 {
        match self.store.clear_prefix(&self.key(prefix)).await {
            Ok(removed) => {
                metrics::counter!(METRIC_CACHE_INVALIDATIONS, "prefix" => prefix.to_string())
                    .increment(1);
                debug!(
                    target = "shopfront::cache",
                    prefix,
                    removed,
                    "cleared cache prefix"
                );
                removed
            }
            Err(err) => {
                self.degrade("clear_prefix", prefix, &err);
                0
            }
        }
    }

    /// Decoded value; an undecodable entry is deleted and reported as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    target = "shopfront::cache",
                    key,
                    error = %err,
                    "discarding undecodable cache entry"
                );
                self.del(key).await;
                None
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        match serde_json::to_string(value) {
            Ok(encoded) => self.set(key, encoded, ttl).await,
            Err(err) => warn!(
                target = "shopfront::cache",
                key,
                error = %err,
                "skipping cache write for unserializable value"
            ),
        }
    }

    /// Read-through: serve `key` from the cache or run `load` and store its result.
    pub async fn get_or_load<T, E, F, Fut>(&self, key: &str, load: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get_json(key).await {
            return Ok(cached);
        }
        let value = load().await?;
        self.set_json(key, &value, None).await;
        Ok(value)
    }

    fn degrade(&self, op: &'static str, key: &str, err: &CacheError) {
        metrics::counter!(
            METRIC_CACHE_ERRORS,
            "op" => op,
            "backend" => self.store.backend_name()
        )
        .increment(1);
        warn!(
            target = "shopfront::cache",
            op,
            key,
            backend = self.store.backend_name(),
            error = %err,
            "cache backend failed; continuing without cache"
        );
    }
}

fn record_lookup(outcome: &'static str) {
    metrics::counter!(METRIC_CACHE_LOOKUPS, "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct FailingStore;

    #[async_trait]
    impl CacheStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Timeout)
        }

        async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::backend("connection refused"))
        }

        async fn del(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Timeout)
        }

        async fn clear_prefix(&self, _prefix: &str) -> Result<u64, CacheError> {
            Err(CacheError::Timeout)
        }

        fn backend_name(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn keys_are_namespaced() {
        let store = Arc::new(MemoryStore::new());
        let cache = Cache::new(store.clone(), "shop", Duration::from_secs(60));

        cache.set("products:id:1", "{}".to_string(), None).await;

        assert_eq!(
            store.get("shop:products:id:1").await.unwrap().as_deref(),
            Some("{}")
        );
        assert_eq!(cache.clear_prefix("products:").await, 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn backend_failures_degrade_to_misses() {
        let cache = Cache::new(Arc::new(FailingStore), "shop", Duration::from_secs(60));

        cache.set("k", "v".to_string(), None).await;
        assert!(cache.get("k").await.is_none());
        cache.del("k").await;
        assert_eq!(cache.clear_prefix("products:").await, 0);

        let loaded: Result<u32, std::convert::Infallible> =
            cache.get_or_load("k", || async { Ok(7) }).await;
        assert_eq!(loaded.unwrap(), 7);
    }

    #[tokio::test]
    async fn get_or_load_only_loads_once() {
        let cache = Cache::in_memory();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: Result<Vec<String>, std::convert::Infallible> = cache
                .get_or_load("blog:list:x", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec!["hello".to_string()])
                })
                .await;
            assert_eq!(value.unwrap(), vec!["hello".to_string()]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn undecodable_entries_are_dropped() {
        let cache = Cache::in_memory();
        cache.set("products:id:1", "not json".to_string(), None).await;

        let value: Option<Vec<u8>> = cache.get_json("products:id:1").await;

        assert!(value.is_none());
        assert!(cache.get("products:id:1").await.is_none());
    }

    #[tokio::test]
    async fn loader_errors_are_not_cached() {
        let cache = Cache::in_memory();
        let first: Result<u8, &str> = cache.get_or_load("k", || async { Err("db down") }).await;
        assert!(first.is_err());
        let second: Result<u8, &str> = cache.get_or_load("k", || async { Ok(1) }).await;
        assert_eq!(second.unwrap(), 1);
    }

    #[test]
    fn from_config_rejects_bad_redis_url() {
        let config = CacheConfig {
            redis_url: Some("not a url".to_string()),
            ..CacheConfig::default()
        };
        assert!(Cache::from_config(&config).is_err());
    }
}
