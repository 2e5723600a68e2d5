//! Redis-backed [`CacheStore`].

use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::MultiplexedConnection};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::debug;

use super::store::{CacheError, CacheStore};

const DELETE_BATCH: usize = 256;
const SCAN_COUNT: u32 = 200;

pub struct RedisStore {
    client: redis::Client,
    connection: Mutex<Option<MultiplexedConnection>>,
    op_timeout: Duration,
}

impl RedisStore {
    /// Validates the URL; no connection is made until the first command.
    pub fn new(url: &str, op_timeout: Duration) -> Result<Self, CacheError> {
        let client =
            redis::Client::open(url).map_err(|err| CacheError::Configuration(err.to_string()))?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
            op_timeout,
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let conn = timeout(
            self.op_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| CacheError::Timeout)?
        .map_err(CacheError::backend)?;
        debug!(
            target = "shopfront::cache::redis",
            "opened redis connection"
        );
        *guard = Some(conn.clone());
        Ok(conn)
    }

    /// Forget the shared connection so the next call reconnects.
    async fn reset(&self) {
        self.connection.lock().await.take();
    }

    async fn run<T, F, Fut>(&self, op: F) -> Result<T, CacheError>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: std::future::Future<Output = redis::RedisResult<T>>,
    {
        let conn = self.connection().await?;
        let result = match timeout(self.op_timeout, op(conn)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(CacheError::backend(err)),
            Err(_) => Err(CacheError::Timeout),
        };
        if result.is_err() {
            self.reset().await;
        }
        result
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let key = key.to_string();
        self.run(|mut conn| async move {
            let value: Option<String> = conn.get(key).await?;
            Ok(value)
        })
        .await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let key = key.to_string();
        let millis = ttl.as_millis().max(1) as u64;
        self.run(|mut conn| async move {
            let reply: redis::RedisResult<()> = redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("PX")
                .arg(millis)
                .query_async(&mut conn)
                .await;
            reply
        })
        .await
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        let key = key.to_string();
        self.run(|mut conn| async move {
            let _removed: i64 = conn.del(key).await?;
            Ok(())
        })
        .await
    }

    async fn clear_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let pattern = format!("{}*", escape_glob(prefix));
        let keys: Vec<String> = self
            .run(|mut conn| async move {
                let mut keys = Vec::new();
                let mut cursor: u64 = 0;
                loop {
                    let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(&pattern)
                        .arg("COUNT")
                        .arg(SCAN_COUNT)
                        .query_async(&mut conn)
                        .await?;
                    keys.extend(batch);
                    if next == 0 {
                        break;
                    }
                    cursor = next;
                }
                Ok(keys)
            })
            .await?;

        let mut removed = 0u64;
        for chunk in keys.chunks(DELETE_BATCH) {
            let chunk = chunk.to_vec();
            let count = self
                .run(|mut conn| async move {
                    let removed: i64 = conn.del(chunk).await?;
                    Ok(removed)
                })
                .await?;
            removed += count.max(0) as u64;
        }
        Ok(removed)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

/// Escape Redis glob metacharacters so a prefix matches literally.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for ch in prefix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
