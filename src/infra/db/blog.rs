use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        BlogListScope, BlogQueryFilter, BlogRepo, BlogWriteRepo, CreateBlogPostParams,
        ReadConsistency, RepoError, UpdateBlogPostParams,
    },
    domain::{entities::BlogPostRecord, types::BlogPostStatus},
};

use super::{PostgresRepositories, like_pattern, map_sqlx_error};

const POST_COLUMNS: &str = "id, title, slug, content, excerpt, featured_image, author, status, \
    published_at, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct BlogPostRow {
    id: Uuid,
    title: String,
    slug: String,
    content: String,
    excerpt: Option<String>,
    featured_image: Option<String>,
    author: String,
    status: BlogPostStatus,
    published_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<BlogPostRow> for BlogPostRecord {
    fn from(row: BlogPostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            content: row.content,
            excerpt: row.excerpt,
            featured_image: row.featured_image,
            author: row.author,
            status: row.status,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl BlogRepo for PostgresRepositories {
    async fn list_posts(
        &self,
        consistency: ReadConsistency,
        scope: BlogListScope,
        filter: &BlogQueryFilter,
    ) -> Result<Vec<BlogPostRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(POST_COLUMNS);
        qb.push(" FROM blog_posts WHERE TRUE");

        match scope {
            BlogListScope::Public => {
                qb.push(" AND status = ");
                qb.push_bind(BlogPostStatus::Published);
                qb.push(" AND published_at IS NOT NULL");
            }
            BlogListScope::Admin { status } => {
                if let Some(status) = status {
                    qb.push(" AND status = ");
                    qb.push_bind(status);
                }
            }
        }

        if let Some(author) = filter.author.as_deref() {
            qb.push(" AND lower(author) = lower(");
            qb.push_bind(author);
            qb.push(")");
        }
        if let Some(search) = filter.search.as_deref() {
            let pattern = like_pattern(search);
            qb.push(" AND (title ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR excerpt ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR content ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }

        match scope {
            BlogListScope::Public => qb.push(" ORDER BY published_at DESC, id DESC"),
            BlogListScope::Admin { .. } => qb.push(" ORDER BY updated_at DESC, id DESC"),
        };

        let rows = qb
            .build_query_as::<BlogPostRow>()
            .fetch_all(self.pool(consistency))
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_post_by_slug(
        &self,
        consistency: ReadConsistency,
        slug: &str,
    ) -> Result<Option<BlogPostRecord>, RepoError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM blog_posts WHERE slug = $1");
        let row = sqlx::query_as::<_, BlogPostRow>(&sql)
            .bind(slug)
            .fetch_optional(self.pool(consistency))
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn find_post(
        &self,
        consistency: ReadConsistency,
        id: Uuid,
    ) -> Result<Option<BlogPostRecord>, RepoError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM blog_posts WHERE id = $1");
        let row = sqlx::query_as::<_, BlogPostRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool(consistency))
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }
}

#[async_trait]
impl BlogWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreateBlogPostParams) -> Result<BlogPostRecord, RepoError> {
        let sql = format!(
            "INSERT INTO blog_posts (id, title, slug, content, excerpt, featured_image, author, \
             status, published_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {POST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, BlogPostRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.title)
            .bind(params.slug)
            .bind(params.content)
            .bind(params.excerpt)
            .bind(params.featured_image)
            .bind(params.author)
            .bind(params.status)
            .bind(params.published_at)
            .fetch_one(self.primary())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_post(&self, params: UpdateBlogPostParams) -> Result<BlogPostRecord, RepoError> {
        let sql = format!(
            "UPDATE blog_posts SET title = $2, slug = $3, content = $4, excerpt = $5, \
             featured_image = $6, author = $7, updated_at = now() \
             WHERE id = $1 RETURNING {POST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, BlogPostRow>(&sql)
            .bind(params.id)
            .bind(params.title)
            .bind(params.slug)
            .bind(params.content)
            .bind(params.excerpt)
            .bind(params.featured_image)
            .bind(params.author)
            .fetch_one(self.primary())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_post_status(
        &self,
        id: Uuid,
        status: BlogPostStatus,
        published_at: Option<OffsetDateTime>,
    ) -> Result<BlogPostRecord, RepoError> {
        let sql = format!(
            "UPDATE blog_posts SET status = $2, published_at = $3, updated_at = now() \
             WHERE id = $1 RETURNING {POST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, BlogPostRow>(&sql)
            .bind(id)
            .bind(status)
            .bind(published_at)
            .fetch_one(self.primary())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
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
