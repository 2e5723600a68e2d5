//! Shopfront cache system.
//!
//! Two layers sit in front of Postgres:
//!
//! - **Object cache** ([`Cache`]): JSON values for product and blog listings
//!   and lookups, stored in Redis when `REDIS_URL` is set and in process
//!   memory otherwise. Entries expire after a TTL and are dropped by prefix
//!   whenever a product or post changes.
//! - **Response cache** ([`ResponseCache`]): rendered public GET responses,
//!   dropped per path through a [`Revalidator`].
//!
//! ```toml
//! [cache]
//! default_ttl_ms = 60000
//! namespace = "shopfront"
//! ```

mod client;
mod config;
pub mod keys;
mod middleware;
mod redis;
mod response;
pub mod revalidate;
mod store;

pub(crate) use client::{METRIC_CACHE_ERRORS, METRIC_CACHE_INVALIDATIONS, METRIC_CACHE_LOOKUPS};
pub use client::Cache;
pub use config::CacheConfig;
pub use middleware::response_cache_layer;
pub use redis::RedisStore;
pub use response::{CacheStoreError, CachedResponse, ResponseCache};
pub use revalidate::{NoopRevalidator, Revalidator};
pub use store::{CacheError, CacheStore, MemoryStore};
