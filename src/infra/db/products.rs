use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder, types::Json};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        CreateProductParams, ProductListScope, ProductQueryFilter, ProductsRepo,
        ProductsWriteRepo, ReadConsistency, RepoError, UpdateProductParams, UpdateStockParams,
    },
    domain::{entities::ProductRecord, entities::Specifications, types::ProductStatus},
};

use super::{PostgresRepositories, like_pattern, map_sqlx_error};

const PRODUCT_COLUMNS: &str = "id, name, description, price_cents, category, brand, sku, \
    image_url, in_stock, stock_quantity, status, specifications, is_active, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: String,
    price_cents: i64,
    category: String,
    brand: Option<String>,
    sku: Option<String>,
    image_url: Option<String>,
    in_stock: bool,
    stock_quantity: i32,
    status: ProductStatus,
    specifications: Json<Specifications>,
    is_active: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ProductRow> for ProductRecord {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price_cents: row.price_cents,
            category: row.category,
            brand: row.brand,
            sku: row.sku,
            image_url: row.image_url,
            in_stock: row.in_stock,
            stock_quantity: row.stock_quantity,
            status: row.status,
            specifications: row.specifications.0,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl PostgresRepositories {
    fn apply_product_scope(qb: &mut QueryBuilder<'_, Postgres>, scope: ProductListScope) {
        match scope {
            ProductListScope::Public => {
                qb.push(" AND is_active = TRUE AND status = ");
                qb.push_bind(ProductStatus::Active);
            }
            ProductListScope::Admin {
                status,
                include_deleted,
            } => {
                if !include_deleted {
                    qb.push(" AND is_active = TRUE");
                }
                if let Some(status) = status {
                    qb.push(" AND status = ");
                    qb.push_bind(status);
                }
            }
        }
    }

    fn apply_product_filter<'q>(
        qb: &mut QueryBuilder<'q, Postgres>,
        filter: &'q ProductQueryFilter,
    ) {
        if let Some(category) = filter.category.as_deref() {
            qb.push(" AND lower(category) = lower(");
            qb.push_bind(category);
            qb.push(")");
        }
        if let Some(brand) = filter.brand.as_deref() {
            qb.push(" AND lower(brand) = lower(");
            qb.push_bind(brand);
            qb.push(")");
        }
        if let Some(in_stock) = filter.in_stock {
            qb.push(" AND in_stock = ");
            qb.push_bind(in_stock);
        }
        if let Some(search) = filter.search.as_deref() {
            let pattern = like_pattern(search);
            qb.push(" AND (name ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR description ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR brand ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
    }
}

#[async_trait]
impl ProductsRepo for PostgresRepositories {
    async fn list_products(
        &self,
        consistency: ReadConsistency,
        scope: ProductListScope,
        filter: &ProductQueryFilter,
    ) -> Result<Vec<ProductRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(PRODUCT_COLUMNS);
        qb.push(" FROM products WHERE TRUE");
        Self::apply_product_scope(&mut qb, scope);
        Self::apply_product_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id DESC");

        let rows = qb
            .build_query_as::<ProductRow>()
            .fetch_all(self.pool(consistency))
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_product(
        &self,
        consistency: ReadConsistency,
        id: Uuid,
    ) -> Result<Option<ProductRecord>, RepoError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool(consistency))
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn count_active(&self, consistency: ReadConsistency) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = TRUE")
            .fetch_one(self.pool(consistency))
            .await
            .map_err(map_sqlx_error)?;
        Self::convert_count(count)
    }
}

#[async_trait]
impl ProductsWriteRepo for PostgresRepositories {
    async fn create_product(
        &self,
        params: CreateProductParams,
    ) -> Result<ProductRecord, RepoError> {
        let sql = format!(
            "INSERT INTO products (id, name, description, price_cents, category, brand, sku, \
             image_url, in_stock, stock_quantity, status, specifications) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.name)
            .bind(params.description)
            .bind(params.price_cents)
            .bind(params.category)
            .bind(params.brand)
            .bind(params.sku)
            .bind(params.image_url)
            .bind(params.in_stock)
            .bind(params.stock_quantity)
            .bind(params.status)
            .bind(Json(params.specifications))
            .fetch_one(self.primary())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_product(
        &self,
        params: UpdateProductParams,
    ) -> Result<ProductRecord, RepoError> {
        let sql = format!(
            "UPDATE products SET name = $2, description = $3, price_cents = $4, category = $5, \
             brand = $6, sku = $7, image_url = $8, specifications = $9, updated_at = now() \
             WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(params.id)
            .bind(params.name)
            .bind(params.description)
            .bind(params.price_cents)
            .bind(params.category)
            .bind(params.brand)
            .bind(params.sku)
            .bind(params.image_url)
            .bind(Json(params.specifications))
            .fetch_one(self.primary())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_product_status(
        &self,
        id: Uuid,
        status: ProductStatus,
    ) -> Result<ProductRecord, RepoError> {
        let sql = format!(
            "UPDATE products SET status = $2, updated_at = now() WHERE id = $1 \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .bind(status)
            .fetch_one(self.primary())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_product_stock(
        &self,
        params: UpdateStockParams,
    ) -> Result<ProductRecord, RepoError> {
        let sql = format!(
            "UPDATE products SET in_stock = $2, stock_quantity = $3, updated_at = now() \
             WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(params.id)
            .bind(params.in_stock)
            .bind(params.stock_quantity)
            .fetch_one(self.primary())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn set_product_active(&self, id: Uuid, active: bool) -> Result<ProductRecord, RepoError> {
        let sql = format!(
            "UPDATE products SET is_active = $2, updated_at = now() WHERE id = $1 \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .bind(active)
            .fetch_one(self.primary())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn delete_product(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.primary())
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
