//! Page revalidation: tells the page layer which public paths are stale.

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use super::response::ResponseCache;

#[async_trait]
pub trait Revalidator: Send + Sync {
    async fn revalidate(&self, paths: &[String]);
}

#[async_trait]
impl Revalidator for ResponseCache {
    async fn revalidate(&self, paths: &[String]) {
        for path in paths {
            let removed = self.invalidate_path(path).await;
            debug!(
                target = "shopfront::cache::revalidate",
                path = %path,
                removed,
                "revalidated path"
            );
        }
    }
}

/// Used when response caching is disabled.
pub struct NoopRevalidator;

#[async_trait]
impl Revalidator for NoopRevalidator {
    async fn revalidate(&self, _paths: &[String]) {}
}

pub fn product_paths(id: Uuid) -> Vec<String> {
    vec![
        "/products".to_string(),
        format!("/products/{id}"),
        "/api/products".to_string(),
        format!("/api/products/{id}"),
    ]
}

/// `previous_slug` covers a rename: both the old and the new URL go stale.
pub fn blog_paths(slug: &str, previous_slug: Option<&str>) -> Vec<String> {
    let mut paths = vec![
        "/blog".to_string(),
        format!("/blog/{slug}"),
        "/api/blog".to_string(),
        format!("/api/blog/{slug}"),
    ];
    if let Some(previous) = previous_slug.filter(|previous| *previous != slug) {
        paths.push(format!("/blog/{previous}"));
        paths.push(format!("/api/blog/{previous}"));
    }
    paths
}

pub fn settings_paths() -> Vec<String> {
    vec!["/".to_string()]
}
