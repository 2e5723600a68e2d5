//! Cache invalidation and page revalidation after content mutations.
//!
//! Runs inline with the mutation, so a response is only sent once stale
//! entries are gone.

use std::sync::Arc;

use uuid::Uuid;

use crate::cache::{Cache, Revalidator, keys, revalidate};

#[derive(Clone)]
pub struct ContentInvalidator {
    cache: Cache,
    revalidator: Arc<dyn Revalidator>,
}

impl ContentInvalidator {
    pub fn new(cache: Cache, revalidator: Arc<dyn Revalidator>) -> Self {
        Self { cache, revalidator }
    }

    pub async fn product_changed(&self, id: Uuid) {
        self.cache.clear_prefix(keys::PRODUCTS_PREFIX).await;
        self.revalidator
            .revalidate(&revalidate::product_paths(id))
            .await;
    }

    pub async fn post_changed(&self, slug: &str, previous_slug: Option<&str>) {
        self.cache.clear_prefix(keys::BLOG_PREFIX).await;
        self.revalidator
            .revalidate(&revalidate::blog_paths(slug, previous_slug))
            .await;
    }

    pub async fn settings_changed(&self) {
        self.revalidator
            .revalidate(&revalidate::settings_paths())
            .await;
    }

    pub async fn revalidate_paths(&self, paths: &[String]) {
        self.revalidator.revalidate(paths).await;
    }
}
