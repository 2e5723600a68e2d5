//! Cache configuration.

use std::time::Duration;

const DEFAULT_TTL_MS: u64 = 60_000;
const DEFAULT_NAMESPACE: &str = "shopfront";
const DEFAULT_REDIS_TIMEOUT_MS: u64 = 250;
const DEFAULT_RESPONSE_LIMIT: usize = 256;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Redis connection URL; the in-process store is used when absent.
    pub redis_url: Option<String>,
    /// TTL applied when a caller does not pass one.
    pub default_ttl: Duration,
    /// Prepended to every key as `{namespace}:`.
    pub namespace: String,
    /// Upper bound for a single Redis round-trip.
    pub redis_timeout: Duration,
    /// Cache rendered public GET responses.
    pub enable_response_cache: bool,
    /// Maximum number of cached responses.
    pub response_limit: usize,
    /// Lifetime of a cached response.
    pub response_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            default_ttl: Duration::from_millis(DEFAULT_TTL_MS),
            namespace: DEFAULT_NAMESPACE.to_string(),
            redis_timeout: Duration::from_millis(DEFAULT_REDIS_TIMEOUT_MS),
            enable_response_cache: true,
            response_limit: DEFAULT_RESPONSE_LIMIT,
            response_ttl: Duration::from_millis(DEFAULT_TTL_MS),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            redis_url: settings.redis_url.clone(),
            default_ttl: settings.default_ttl,
            namespace: settings.namespace.clone(),
            redis_timeout: settings.redis_timeout,
            enable_response_cache: settings.enable_response_cache,
            response_limit: settings.response_limit.get() as usize,
            response_ttl: settings.response_ttl,
        }
    }
}
