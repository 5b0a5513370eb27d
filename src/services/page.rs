//! Page service
//!
//! Business logic for standalone pages: CRUD with slug handling and
//! Markdown rendering, and the published-only public lookup.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::PageRepository;
use crate::models::{CreatePageInput, Page, PageStatus, UpdatePageInput};
use crate::services::markdown::MarkdownRenderer;
use crate::services::slug::generate_slug;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

const PAGE_CACHE_TTL: Duration = Duration::from_secs(600);

/// Error types for page service operations
#[derive(Debug, thiserror::Error)]
pub enum PageServiceError {
    /// Page not found
    #[error("Page not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Page service for standalone pages
pub struct PageService {
    repo: Arc<dyn PageRepository>,
    cache: Arc<Cache>,
    renderer: MarkdownRenderer,
}

impl PageService {
    /// Create a new page service
    pub fn new(repo: Arc<dyn PageRepository>, cache: Arc<Cache>, renderer: MarkdownRenderer) -> Self {
        Self {
            repo,
            cache,
            renderer,
        }
    }

    /// Create a new page
    pub async fn create(&self, input: CreatePageInput) -> Result<Page, PageServiceError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(PageServiceError::ValidationError(
                "Title cannot be empty".to_string(),
            ));
        }

        let slug = match input.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => generate_slug(slug),
            _ => generate_slug(title),
        };
        if slug.is_empty() {
            return Err(PageServiceError::ValidationError(
                "Title produces an empty slug".to_string(),
            ));
        }
        if self
            .repo
            .slug_exists(&slug, None)
            .await
            .context("Failed to check page slug")?
        {
            return Err(PageServiceError::ValidationError(format!(
                "Page slug '{}' already exists",
                slug
            )));
        }

        let content_html = self.renderer.render(&input.content);
        let mut page = Page::new(slug, title.to_string(), input.content, content_html);
        page.status = input.status.unwrap_or_default();

        let created = self
            .repo
            .create(&page)
            .await
            .context("Failed to create page")?;

        self.invalidate_cache(&created.slug).await;
        Ok(created)
    }

    /// Update an existing page
    pub async fn update(&self, id: i64, input: UpdatePageInput) -> Result<Page, PageServiceError> {
        let mut page = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to load page")?
            .ok_or_else(|| PageServiceError::NotFound(format!("Page with ID {} not found", id)))?;

        let old_slug = page.slug.clone();

        if let Some(title) = input.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(PageServiceError::ValidationError(
                    "Title cannot be empty".to_string(),
                ));
            }
            page.title = title;
        }

        if let Some(slug) = input.slug {
            let slug = generate_slug(slug.trim());
            if slug.is_empty() {
                return Err(PageServiceError::ValidationError(
                    "Slug cannot be empty".to_string(),
                ));
            }
            if slug != page.slug
                && self
                    .repo
                    .slug_exists(&slug, Some(id))
                    .await
                    .context("Failed to check page slug")?
            {
                return Err(PageServiceError::ValidationError(format!(
                    "Page slug '{}' already exists",
                    slug
                )));
            }
            page.slug = slug;
        }

        if let Some(content) = input.content {
            page.content_html = self.renderer.render(&content);
            page.content = content;
        }

        if let Some(status) = input.status {
            page.status = status;
        }

        page.updated_at = Utc::now();

        self.repo
            .update(&page)
            .await
            .context("Failed to update page")?;

        self.invalidate_cache(&old_slug).await;
        if old_slug != page.slug {
            self.invalidate_cache(&page.slug).await;
        }
        Ok(page)
    }

    /// Delete a page
    pub async fn delete(&self, id: i64) -> Result<(), PageServiceError> {
        let page = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to load page")?
            .ok_or_else(|| PageServiceError::NotFound(format!("Page with ID {} not found", id)))?;

        self.repo
            .delete(page.id)
            .await
            .context("Failed to delete page")?;

        self.invalidate_cache(&page.slug).await;
        Ok(())
    }

    /// Get a page by ID (any status; the admin path)
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Page>, PageServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get page")
            .map_err(Into::into)
    }

    /// Get a published page by slug (the public path, cached)
    pub async fn get_published_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Page>, PageServiceError> {
        let cache_key = format!("pages:slug:{}", slug);
        if let Ok(Some(cached)) = self.cache.get::<Page>(&cache_key).await {
            return Ok(Some(cached));
        }

        let page = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get page by slug")?
            .filter(|p| p.status == PageStatus::Published);

        if let Some(ref page) = page {
            let _ = self.cache.set(&cache_key, page, PAGE_CACHE_TTL).await;
        }
        Ok(page)
    }

    /// List all pages (the admin view)
    pub async fn list(&self) -> Result<Vec<Page>, PageServiceError> {
        self.repo
            .list()
            .await
            .context("Failed to list pages")
            .map_err(Into::into)
    }

    /// Count all pages
    pub async fn count_all(&self) -> Result<i64, PageServiceError> {
        self.repo
            .count_all()
            .await
            .context("Failed to count pages")
            .map_err(Into::into)
    }

    async fn invalidate_cache(&self, slug: &str) {
        let _ = self.cache.delete(&format!("pages:slug:{}", slug)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::SqlxPageRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> PageService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        PageService::new(
            SqlxPageRepository::boxed(pool),
            create_cache(&CacheConfig::default()),
            MarkdownRenderer::new(),
        )
    }

    fn input(title: &str) -> CreatePageInput {
        CreatePageInput {
            slug: None,
            title: title.to_string(),
            content: "# About\n\nWe write things.".to_string(),
            status: None,
        }
    }

    #[tokio::test]
    async fn test_create_renders_markdown() {
        let service = setup().await;

        let page = service.create(input("About Us")).await.unwrap();

        assert_eq!(page.slug, "about-us");
        assert!(page.content_html.contains("<h1"));
        assert_eq!(page.status, PageStatus::Draft);
    }

    #[tokio::test]
    async fn test_create_duplicate_slug_rejected() {
        let service = setup().await;

        service.create(input("Duped")).await.unwrap();
        let result = service.create(input("Duped")).await;
        assert!(matches!(result, Err(PageServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_public_lookup_hides_drafts() {
        let service = setup().await;
        let page = service.create(input("Hidden")).await.unwrap();

        assert!(service
            .get_published_by_slug("hidden")
            .await
            .unwrap()
            .is_none());

        service
            .update(
                page.id,
                UpdatePageInput {
                    status: Some(PageStatus::Published),
                    ..UpdatePageInput::default()
                },
            )
            .await
            .unwrap();

        assert!(service
            .get_published_by_slug("hidden")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_update_content_rerenders() {
        let service = setup().await;
        let page = service.create(input("Evolving")).await.unwrap();

        let updated = service
            .update(
                page.id,
                UpdatePageInput {
                    content: Some("New **bold** body".to_string()),
                    ..UpdatePageInput::default()
                },
            )
            .await
            .unwrap();

        assert!(updated.content_html.contains("<strong>bold</strong>"));
    }

    #[tokio::test]
    async fn test_delete() {
        let service = setup().await;
        let page = service.create(input("Doomed")).await.unwrap();

        service.delete(page.id).await.unwrap();
        assert!(service.get_by_id(page.id).await.unwrap().is_none());
        assert!(matches!(
            service.delete(page.id).await,
            Err(PageServiceError::NotFound(_))
        ));
    }
}
