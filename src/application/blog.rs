//! Blog CMS: published posts for the public site, full CRUD for admins.

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{
    application::{
        invalidation::ContentInvalidator,
        repos::{
            BlogListScope, BlogQueryFilter, BlogRepo, BlogWriteRepo, CreateBlogPostParams,
            ReadConsistency, RepoError, UpdateBlogPostParams,
        },
        validate::{ensure_non_empty, optional_text},
    },
    cache::{Cache, keys},
    domain::{
        entities::BlogPostRecord,
        error::DomainError,
        slug::{SlugAsyncError, SlugError, derive_slug, generate_unique_slug},
        types::BlogPostStatus,
    },
};

#[derive(Debug, Error)]
pub enum BlogError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("slug `{0}` is already taken")]
    DuplicateSlug(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl BlogError {
    fn not_found() -> Self {
        Self::Domain(DomainError::not_found("blog post"))
    }
}

#[derive(Debug, Clone)]
pub struct CreatePostCommand {
    pub title: String,
    /// Explicit slug; derived from the title when absent.
    pub slug: Option<String>,
    pub content: String,
    pub excerpt: Option<String>,
    pub featured_image: Option<String>,
    pub author: String,
    pub status: BlogPostStatus,
}

#[derive(Debug, Clone, Default)]
pub struct UpdatePostCommand {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub featured_image: Option<String>,
    pub author: Option<String>,
}

#[derive(Clone)]
pub struct BlogService {
    reader: Arc<dyn BlogRepo>,
    writer: Arc<dyn BlogWriteRepo>,
    cache: Cache,
    invalidator: ContentInvalidator,
}

impl BlogService {
    pub fn new(
        reader: Arc<dyn BlogRepo>,
        writer: Arc<dyn BlogWriteRepo>,
        cache: Cache,
        invalidator: ContentInvalidator,
    ) -> Self {
        Self {
            reader,
            writer,
            cache,
            invalidator,
        }
    }

    pub async fn list_public(
        &self,
        filter: &BlogQueryFilter,
    ) -> Result<Vec<BlogPostRecord>, BlogError> {
        let filter = filter.normalized();
        let key = keys::blog_list(&filter);
        self.cache
            .get_or_load(&key, || async {
                self.reader
                    .list_posts(ReadConsistency::Pooled, BlogListScope::Public, &filter)
                    .await
                    .map_err(BlogError::from)
            })
            .await
    }

    pub async fn get_public(&self, slug: &str) -> Result<BlogPostRecord, BlogError> {
        let key = keys::blog_by_slug(slug);
        self.cache
            .get_or_load(&key, || async {
                self.reader
                    .find_post_by_slug(ReadConsistency::Pooled, slug)
                    .await?
                    .filter(|post| post.status == BlogPostStatus::Published)
                    .ok_or_else(BlogError::not_found)
            })
            .await
    }

    pub async fn list_admin(
        &self,
        status: Option<BlogPostStatus>,
        filter: &BlogQueryFilter,
    ) -> Result<Vec<BlogPostRecord>, BlogError> {
        Ok(self
            .reader
            .list_posts(
                ReadConsistency::Primary,
                BlogListScope::Admin { status },
                &filter.normalized(),
            )
            .await?)
    }

    pub async fn get_admin(&self, id: Uuid) -> Result<BlogPostRecord, BlogError> {
        self.load_primary(id).await
    }

    pub async fn create(&self, command: CreatePostCommand) -> Result<BlogPostRecord, BlogError> {
        ensure_non_empty(&command.title, "title")?;
        ensure_non_empty(&command.content, "content")?;
        ensure_non_empty(&command.author, "author")?;

        let slug = match optional_text(command.slug) {
            Some(explicit) => self.claim_explicit_slug(&explicit, None).await?,
            None => self.generate_slug(&command.title).await?,
        };

        let published_at =
            (command.status == BlogPostStatus::Published).then(OffsetDateTime::now_utc);
        let params = CreateBlogPostParams {
            title: command.title.trim().to_string(),
            slug,
            content: command.content,
            excerpt: optional_text(command.excerpt),
            featured_image: optional_text(command.featured_image),
            author: command.author.trim().to_string(),
            status: command.status,
            published_at,
        };

        let slug = params.slug.clone();
        let post = self
            .writer
            .create_post(params)
            .await
            .map_err(|err| map_write_error(err, &slug))?;
        info!(
            target = "shopfront::application::blog",
            post_id = %post.id,
            slug = %post.slug,
            "blog post created"
        );
        self.invalidator.post_changed(&post.slug, None).await;
        Ok(post)
    }

    /// Fields left `None` keep their stored value.
    pub async fn update(
        &self,
        id: Uuid,
        command: UpdatePostCommand,
    ) -> Result<BlogPostRecord, BlogError> {
        let current = self.load_primary(id).await?;

        let title = command.title.unwrap_or_else(|| current.title.clone());
        let content = command.content.unwrap_or_else(|| current.content.clone());
        let author = command.author.unwrap_or_else(|| current.author.clone());
        ensure_non_empty(&title, "title")?;
        ensure_non_empty(&content, "content")?;
        ensure_non_empty(&author, "author")?;

        let slug = match optional_text(command.slug) {
            Some(explicit) if explicit != current.slug => {
                self.claim_explicit_slug(&explicit, Some(id)).await?
            }
            _ => current.slug.clone(),
        };

        let params = UpdateBlogPostParams {
            id,
            title: title.trim().to_string(),
            slug,
            content,
            excerpt: match command.excerpt {
                Some(excerpt) => optional_text(Some(excerpt)),
                None => current.excerpt.clone(),
            },
            featured_image: match command.featured_image {
                Some(image) => optional_text(Some(image)),
                None => current.featured_image.clone(),
            },
            author: author.trim().to_string(),
        };

        let slug = params.slug.clone();
        let post = self
            .writer
            .update_post(params)
            .await
            .map_err(|err| map_write_error(err, &slug))?;
        self.invalidator
            .post_changed(&post.slug, Some(&current.slug))
            .await;
        Ok(post)
    }

    /// Publishing stamps `published_at` once; returning to draft clears it;
    /// archiving keeps it.
    pub async fn set_status(
        &self,
        id: Uuid,
        status: BlogPostStatus,
    ) -> Result<BlogPostRecord, BlogError> {
        let current = self.load_primary(id).await?;
        if current.status == status {
            return Ok(current);
        }

        let published_at = match status {
            BlogPostStatus::Published => {
                Some(current.published_at.unwrap_or_else(OffsetDateTime::now_utc))
            }
            BlogPostStatus::Draft => None,
            BlogPostStatus::Archived => current.published_at,
        };

        let post = self
            .writer
            .update_post_status(id, status, published_at)
            .await
            .map_err(|err| map_write_error(err, &current.slug))?;
        info!(
            target = "shopfront::application::blog",
            post_id = %id,
            from = current.status.as_str(),
            to = status.as_str(),
            "blog post status changed"
        );
        self.invalidator.post_changed(&post.slug, None).await;
        Ok(post)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), BlogError> {
        let current = self.load_primary(id).await?;
        self.writer
            .delete_post(id)
            .await
            .map_err(|err| map_write_error(err, &current.slug))?;
        self.invalidator.post_changed(&current.slug, None).await;
        Ok(())
    }

    async fn load_primary(&self, id: Uuid) -> Result<BlogPostRecord, BlogError> {
        self.reader
            .find_post(ReadConsistency::Primary, id)
            .await?
            .ok_or_else(BlogError::not_found)
    }

    async fn generate_slug(&self, title: &str) -> Result<String, BlogError> {
        let reader = self.reader.clone();
        let result = generate_unique_slug(title, move |candidate| {
            let reader = reader.clone();
            let candidate = candidate.to_string();
            async move {
                reader
                    .find_post_by_slug(ReadConsistency::Primary, &candidate)
                    .await
                    .map(|existing| existing.is_none())
            }
        })
        .await;

        match result {
            Ok(slug) => Ok(slug),
            Err(SlugAsyncError::Slug(SlugError::Exhausted { base })) => {
                Err(BlogError::DuplicateSlug(base))
            }
            Err(SlugAsyncError::Slug(err)) => Err(DomainError::validation(err.to_string()).into()),
            Err(SlugAsyncError::Predicate(err)) => Err(err.into()),
        }
    }

    /// Normalises an explicit slug and fails if another post already owns it.
    async fn claim_explicit_slug(
        &self,
        explicit: &str,
        owner: Option<Uuid>,
    ) -> Result<String, BlogError> {
        let slug = derive_slug(explicit).map_err(|err| DomainError::validation(err.to_string()))?;
        let existing = self
            .reader
            .find_post_by_slug(ReadConsistency::Primary, &slug)
            .await?;
        match existing {
            Some(post) if Some(post.id) != owner => Err(BlogError::DuplicateSlug(slug)),
            _ => Ok(slug),
        }
    }
}

/// A unique-constraint race on `slug` surfaces as a conflict, and a vanished
/// row as not found.
fn map_write_error(err: RepoError, slug: &str) -> BlogError {
    match err {
        RepoError::Duplicate { .. } => BlogError::DuplicateSlug(slug.to_string()),
        RepoError::NotFound => BlogError::not_found(),
        other => BlogError::Repo(other),
    }
}
