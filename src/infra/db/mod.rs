//! Postgres-backed repository implementations.
//!
//! Two pools back every repository: `pooled` (a pgbouncer or a read replica,
//! may lag) and `primary`. Reads pick one through [`ReadConsistency`]; writes
//! always use the primary.

mod admins;
mod appointments;
mod blog;
mod inquiries;
mod products;
mod repairs;
mod settings;
mod util;

pub use util::map_sqlx_error;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use sqlx::{
    query,
    postgres::{PgPool, PgPoolOptions},
};
use tracing::info;

use crate::application::repos::{HealthRepo, ReadConsistency, RepoError};
use crate::config::DatabaseSettings;
use crate::infra::error::InfraError;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct PostgresRepositories {
    pooled: Arc<PgPool>,
    primary: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pooled: PgPool, primary: PgPool) -> Self {
        Self {
            pooled: Arc::new(pooled),
            primary: Arc::new(primary),
        }
    }

    /// Both roles share one pool; used by tests and single-node setups.
    pub fn single(pool: PgPool) -> Self {
        Self::new(pool.clone(), pool)
    }

    /// Builds both pools from settings; the primary falls back to the pooled URL.
    pub async fn connect_from_settings(settings: &DatabaseSettings) -> Result<Self, InfraError> {
        let url = settings
            .url
            .as_deref()
            .ok_or_else(|| InfraError::configuration("DATABASE_URL is not set"))?;
        let primary_url = settings.primary_url().unwrap_or(url);

        let pooled = Self::connect(url, settings.max_connections.get())
            .await
            .map_err(|err| InfraError::database(format!("pooled connection failed: {err}")))?;
        let primary = Self::connect(primary_url, settings.primary_max_connections.get())
            .await
            .map_err(|err| InfraError::database(format!("primary connection failed: {err}")))?;

        info!(
            target = "shopfront::db",
            split = settings.primary_url.is_some(),
            "database pools ready"
        );
        Ok(Self::new(pooled, primary))
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(url)
            .await
    }

    pub fn pool(&self, consistency: ReadConsistency) -> &PgPool {
        match consistency {
            ReadConsistency::Pooled => &self.pooled,
            ReadConsistency::Primary => &self.primary,
        }
    }

    pub fn primary(&self) -> &PgPool {
        &self.primary
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    fn convert_count(value: i64) -> Result<u64, RepoError> {
        value
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }
}

#[async_trait]
impl HealthRepo for PostgresRepositories {
    async fn ping(&self) -> Result<(), RepoError> {
        query("SELECT 1")
            .execute(self.primary())
            .await
            .map(|_| ())
            .map_err(map_sqlx_error)
    }
}

/// `%value%` with LIKE metacharacters escaped.
fn like_pattern(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('%');
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}
