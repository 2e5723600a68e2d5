//! Product catalogue: cached public reads, admin writes, soft delete with
//! bounded confirmation polling.

use std::{future::Future, num::NonZeroU32, sync::Arc, time::Duration};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    application::{
        invalidation::ContentInvalidator,
        repos::{
            CreateProductParams, ProductListScope, ProductQueryFilter, ProductsRepo,
            ProductsWriteRepo, ReadConsistency, RepoError, UpdateProductParams, UpdateStockParams,
        },
        validate::{ensure_non_empty, optional_text},
    },
    cache::{Cache, keys},
    config::DeletePollingSettings,
    domain::{
        entities::{ProductRecord, Specifications},
        error::DomainError,
        types::ProductStatus,
    },
};

pub(crate) const METRIC_DELETE_POLLS: &str = "shopfront_product_delete_polls_total";
pub(crate) const METRIC_DELETE_POLL_ATTEMPTS: &str = "shopfront_product_delete_poll_attempts";

#[derive(Debug, Error)]
pub enum ProductError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl ProductError {
    fn not_found() -> Self {
        Self::Domain(DomainError::not_found("product"))
    }
}

/// How long a soft delete waits for the pooled connection to observe it.
#[derive(Debug, Clone, Copy)]
pub struct DeletePolicy {
    pub attempts: NonZeroU32,
    pub delay: Duration,
}

impl Default for DeletePolicy {
    fn default() -> Self {
        Self {
            attempts: NonZeroU32::MIN.saturating_add(4),
            delay: Duration::from_millis(200),
        }
    }
}

impl From<DeletePollingSettings> for DeletePolicy {
    fn from(settings: DeletePollingSettings) -> Self {
        Self {
            attempts: settings.attempts,
            delay: settings.delay,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteOutcome {
    pub product: ProductRecord,
    /// The pooled read observed the lower active count before polling gave up.
    pub confirmed: bool,
    pub attempts: u32,
}

#[derive(Debug, Clone)]
pub struct ProductCommand {
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub category: String,
    pub brand: Option<String>,
    pub sku: Option<String>,
    pub image_url: Option<String>,
    pub in_stock: bool,
    pub stock_quantity: i32,
    pub status: ProductStatus,
    pub specifications: Specifications,
}

#[derive(Clone)]
pub struct ProductService {
    reader: Arc<dyn ProductsRepo>,
    writer: Arc<dyn ProductsWriteRepo>,
    cache: Cache,
    invalidator: ContentInvalidator,
    policy: DeletePolicy,
}

impl ProductService {
    pub fn new(
        reader: Arc<dyn ProductsRepo>,
        writer: Arc<dyn ProductsWriteRepo>,
        cache: Cache,
        invalidator: ContentInvalidator,
        policy: DeletePolicy,
    ) -> Self {
        Self {
            reader,
            writer,
            cache,
            invalidator,
            policy,
        }
    }

    /// Storefront listing: active, non-deleted products, read through the cache.
    pub async fn list_public(
        &self,
        filter: &ProductQueryFilter,
    ) -> Result<Vec<ProductRecord>, ProductError> {
        let filter = filter.normalized();
        let key = keys::product_list(&filter);
        self.cache
            .get_or_load(&key, || async {
                self.reader
                    .list_products(ReadConsistency::Pooled, ProductListScope::Public, &filter)
                    .await
                    .map_err(ProductError::from)
            })
            .await
    }

    /// Storefront detail; soft-deleted and non-active products are hidden.
    pub async fn get_public(&self, id: Uuid) -> Result<ProductRecord, ProductError> {
        let key = keys::product_by_id(id);
        self.cache
            .get_or_load(&key, || async {
                self.reader
                    .find_product(ReadConsistency::Pooled, id)
                    .await?
                    .filter(ProductRecord::is_listed)
                    .ok_or_else(ProductError::not_found)
            })
            .await
    }

    pub async fn list_admin(
        &self,
        status: Option<ProductStatus>,
        include_deleted: bool,
        filter: &ProductQueryFilter,
    ) -> Result<Vec<ProductRecord>, ProductError> {
        let scope = ProductListScope::Admin {
            status,
            include_deleted,
        };
        Ok(self
            .reader
            .list_products(ReadConsistency::Primary, scope, &filter.normalized())
            .await?)
    }

    pub async fn get_admin(&self, id: Uuid) -> Result<ProductRecord, ProductError> {
        self.load_primary(id).await
    }

    pub async fn create(&self, command: ProductCommand) -> Result<ProductRecord, ProductError> {
        let command = validate_command(command)?;
        let params = CreateProductParams {
            name: command.name,
            description: command.description,
            price_cents: command.price_cents,
            category: command.category,
            brand: command.brand,
            sku: command.sku,
            image_url: command.image_url,
            in_stock: command.in_stock,
            stock_quantity: command.stock_quantity,
            status: command.status,
            specifications: command.specifications,
        };

        let product = self.writer.create_product(params).await?;
        info!(
            target = "shopfront::application::products",
            product_id = %product.id,
            "product created"
        );
        self.invalidator.product_changed(product.id).await;
        Ok(product)
    }

    /// Replaces the descriptive fields. Status, stock and the soft-delete
    /// flag have their own operations.
    pub async fn update(
        &self,
        id: Uuid,
        command: ProductCommand,
    ) -> Result<ProductRecord, ProductError> {
        let command = validate_command(command)?;
        let params = UpdateProductParams {
            id,
            name: command.name,
            description: command.description,
            price_cents: command.price_cents,
            category: command.category,
            brand: command.brand,
            sku: command.sku,
            image_url: command.image_url,
            specifications: command.specifications,
        };

        let product = self
            .writer
            .update_product(params)
            .await
            .map_err(not_found_as_domain)?;
        self.invalidator.product_changed(id).await;
        Ok(product)
    }

    pub async fn set_status(
        &self,
        id: Uuid,
        status: ProductStatus,
    ) -> Result<ProductRecord, ProductError> {
        let current = self.load_primary(id).await?;
        if current.status == status {
            return Ok(current);
        }
        if !current.status.can_transition_to(status) {
            return Err(DomainError::transition(
                "product",
                current.status.as_str(),
                status.as_str(),
            )
            .into());
        }

        let product = self
            .writer
            .update_product_status(id, status)
            .await
            .map_err(not_found_as_domain)?;
        self.invalidator.product_changed(id).await;
        Ok(product)
    }

    pub async fn update_stock(
        &self,
        id: Uuid,
        in_stock: bool,
        stock_quantity: i32,
    ) -> Result<ProductRecord, ProductError> {
        if stock_quantity < 0 {
            return Err(DomainError::validation("stock_quantity must not be negative").into());
        }
        let product = self
            .writer
            .update_product_stock(UpdateStockParams {
                id,
                in_stock,
                stock_quantity,
            })
            .await
            .map_err(not_found_as_domain)?;
        self.invalidator.product_changed(id).await;
        Ok(product)
    }

    /// Hide the product, then poll the pooled connection until the active
    /// count drops or the attempts run out. Never rolls back.
    pub async fn soft_delete(&self, id: Uuid) -> Result<DeleteOutcome, ProductError> {
        let current = self.load_primary(id).await?;
        if !current.is_active {
            return Ok(DeleteOutcome {
                product: current,
                confirmed: true,
                attempts: 0,
            });
        }

        let baseline = self.reader.count_active(ReadConsistency::Primary).await?;
        let product = self
            .writer
            .set_product_active(id, false)
            .await
            .map_err(not_found_as_domain)?;

        let reader = self.reader.clone();
        let (confirmed, attempts) = poll_until_below(baseline, self.policy, || {
            let reader = reader.clone();
            async move { reader.count_active(ReadConsistency::Pooled).await }
        })
        .await;

        let outcome = if confirmed { "confirmed" } else { "unconfirmed" };
        metrics::counter!(METRIC_DELETE_POLLS, "outcome" => outcome).increment(1);
        metrics::histogram!(METRIC_DELETE_POLL_ATTEMPTS).record(f64::from(attempts));

        if confirmed {
            info!(
                target = "shopfront::application::products",
                product_id = %id,
                attempts,
                "soft delete observed on pooled reads"
            );
        } else {
            warn!(
                target = "shopfront::application::products",
                product_id = %id,
                attempts,
                baseline,
                "soft delete not yet visible on pooled reads; responding anyway"
            );
        }

        self.invalidator.product_changed(id).await;
        Ok(DeleteOutcome {
            product,
            confirmed,
            attempts,
        })
    }

    pub async fn restore(&self, id: Uuid) -> Result<ProductRecord, ProductError> {
        let current = self.load_primary(id).await?;
        if current.is_active {
            return Ok(current);
        }
        let product = self
            .writer
            .set_product_active(id, true)
            .await
            .map_err(not_found_as_domain)?;
        self.invalidator.product_changed(id).await;
        Ok(product)
    }

    pub async fn hard_delete(&self, id: Uuid) -> Result<(), ProductError> {
        self.writer
            .delete_product(id)
            .await
            .map_err(not_found_as_domain)?;
        info!(
            target = "shopfront::application::products",
            product_id = %id,
            "product permanently deleted"
        );
        self.invalidator.product_changed(id).await;
        Ok(())
    }

    async fn load_primary(&self, id: Uuid) -> Result<ProductRecord, ProductError> {
        self.reader
            .find_product(ReadConsistency::Primary, id)
            .await?
            .ok_or_else(ProductError::not_found)
    }
}

/// Re-read the count up to `policy.attempts` times, sleeping before each read.
/// Returns whether it dropped below `baseline` and how many reads were made.
/// Read errors count as an unobserved attempt.
async fn poll_until_below<F, Fut>(baseline: u64, policy: DeletePolicy, mut count: F) -> (bool, u32)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<u64, RepoError>>,
{
    for attempt in 1..=policy.attempts.get() {
        tokio::time::sleep(policy.delay).await;
        match count().await {
            Ok(current) if current < baseline => return (true, attempt),
            Ok(_) => {}
            Err(err) => warn!(
                target = "shopfront::application::products",
                attempt,
                error = %err,
                "active count read failed while polling"
            ),
        }
    }
    (false, policy.attempts.get())
}

fn validate_command(mut command: ProductCommand) -> Result<ProductCommand, DomainError> {
    ensure_non_empty(&command.name, "name")?;
    ensure_non_empty(&command.category, "category")?;
    if command.price_cents < 0 {
        return Err(DomainError::validation("price must not be negative"));
    }
    if command.stock_quantity < 0 {
        return Err(DomainError::validation("stock_quantity must not be negative"));
    }
    command.name = command.name.trim().to_string();
    command.category = command.category.trim().to_string();
    command.description = command.description.trim().to_string();
    command.brand = optional_text(command.brand);
    command.sku = optional_text(command.sku);
    command.image_url = optional_text(command.image_url);
    Ok(command)
}

fn not_found_as_domain(err: RepoError) -> ProductError {
    match err {
        RepoError::NotFound => ProductError::not_found(),
        other => ProductError::Repo(other),
    }
}
