//! Post service
//!
//! Business logic for posts: creation with slug generation and
//! de-duplication, Markdown rendering, excerpt derivation, publication
//! transitions, tag assignment, and cache maintenance.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{CategoryRepository, PostRepository};
use crate::models::{
    CreatePostInput, ListParams, PagedResult, Post, PostFilter, PostStatus, Tag, UpdatePostInput,
    DEFAULT_CATEGORY_ID,
};
use crate::services::markdown::{MarkdownRenderer, TocEntry};
use crate::services::slug::generate_slug;
use crate::services::tag::TagService;
use anyhow::Context;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const LIST_CACHE_TTL: Duration = Duration::from_secs(120);
const POST_CACHE_TTL: Duration = Duration::from_secs(600);

/// Maximum excerpt length in characters
const EXCERPT_MAX_CHARS: usize = 200;

/// Upper bound on slug de-duplication attempts
const MAX_SLUG_ATTEMPTS: u32 = 1000;

static TAG_STRIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// Post not found
    #[error("Post not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Post service for managing blog posts
pub struct PostService {
    repo: Arc<dyn PostRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    tags: Arc<TagService>,
    cache: Arc<Cache>,
    renderer: MarkdownRenderer,
}

impl PostService {
    /// Create a new post service
    pub fn new(
        repo: Arc<dyn PostRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        tags: Arc<TagService>,
        cache: Arc<Cache>,
        renderer: MarkdownRenderer,
    ) -> Self {
        Self {
            repo,
            category_repo,
            tags,
            cache,
            renderer,
        }
    }

    /// Create a new post
    ///
    /// The slug is taken from the input or generated from the title, and
    /// de-duplicated with a numeric suffix on collision. Markdown is
    /// rendered to HTML; the excerpt is derived from the content when not
    /// supplied. An unknown category falls back to the default category.
    pub async fn create(&self, input: CreatePostInput) -> Result<Post, PostServiceError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(PostServiceError::ValidationError(
                "Title cannot be empty".to_string(),
            ));
        }

        let base_slug = match input.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => generate_slug(slug),
            _ => generate_slug(title),
        };
        if base_slug.is_empty() {
            return Err(PostServiceError::ValidationError(
                "Title produces an empty slug".to_string(),
            ));
        }
        let slug = self.dedupe_slug(&base_slug, None).await?;

        let category_id = self.resolve_category(input.category_id).await?;

        let content_html = self.renderer.render(&input.content);
        let excerpt = match input.excerpt.as_deref().map(str::trim) {
            Some(excerpt) if !excerpt.is_empty() => excerpt.to_string(),
            _ => derive_excerpt(&content_html),
        };

        let status = input.status.unwrap_or_default();
        let mut post = Post::new(
            slug,
            title.to_string(),
            input.content,
            content_html,
            excerpt,
            category_id,
            status,
        );
        post.thumbnail = input.thumbnail;

        let created = self
            .repo
            .create(&post)
            .await
            .context("Failed to create post")?;

        if !input.tags.is_empty() {
            self.set_tags(created.id, &input.tags).await?;
        }

        self.invalidate_list_cache().await;
        tracing::info!("Created post '{}' ({})", created.title, created.slug);
        Ok(created)
    }

    /// Update an existing post
    ///
    /// Only supplied fields change. Content changes re-render the HTML
    /// and re-derive the excerpt when one was never set explicitly. The
    /// first transition to published stamps `published_at`.
    pub async fn update(
        &self,
        id: i64,
        input: UpdatePostInput,
    ) -> Result<Post, PostServiceError> {
        if !input.has_changes() {
            return Err(PostServiceError::ValidationError(
                "No fields to update".to_string(),
            ));
        }

        let mut post = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to load post")?
            .ok_or_else(|| PostServiceError::NotFound(format!("Post with ID {} not found", id)))?;

        let old_slug = post.slug.clone();

        if let Some(title) = input.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(PostServiceError::ValidationError(
                    "Title cannot be empty".to_string(),
                ));
            }
            post.title = title;
        }

        if let Some(slug) = input.slug {
            let base = generate_slug(slug.trim());
            if base.is_empty() {
                return Err(PostServiceError::ValidationError(
                    "Slug cannot be empty".to_string(),
                ));
            }
            if base != post.slug {
                post.slug = self.dedupe_slug(&base, Some(post.id)).await?;
            }
        }

        if let Some(content) = input.content {
            post.content_html = self.renderer.render(&content);
            post.content = content;
            post.excerpt = derive_excerpt(&post.content_html);
        }

        if let Some(excerpt) = input.excerpt {
            post.excerpt = excerpt.trim().to_string();
        }

        if let Some(category_id) = input.category_id {
            post.category_id = self.resolve_category(Some(category_id)).await?;
        }

        if let Some(status) = input.status {
            if status == PostStatus::Published && post.published_at.is_none() {
                post.published_at = Some(Utc::now());
            }
            post.status = status;
        }

        if let Some(thumbnail) = input.thumbnail {
            post.thumbnail = if thumbnail.is_empty() {
                None
            } else {
                Some(thumbnail)
            };
        }

        if let Some(is_pinned) = input.is_pinned {
            post.is_pinned = is_pinned;
        }

        if let Some(pin_order) = input.pin_order {
            post.pin_order = pin_order;
        }

        post.updated_at = Utc::now();

        self.repo
            .update(&post)
            .await
            .context("Failed to update post")?;

        if let Some(ref tags) = input.tags {
            self.set_tags(post.id, tags).await?;
        }

        self.invalidate_post_cache(post.id, &old_slug).await;
        if old_slug != post.slug {
            self.invalidate_post_cache(post.id, &post.slug).await;
        }
        Ok(post)
    }

    /// Delete a post (tags and comments cascade)
    pub async fn delete(&self, id: i64) -> Result<(), PostServiceError> {
        let post = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to load post")?
            .ok_or_else(|| PostServiceError::NotFound(format!("Post with ID {} not found", id)))?;

        self.repo
            .delete(post.id)
            .await
            .context("Failed to delete post")?;

        self.invalidate_post_cache(post.id, &post.slug).await;
        tracing::info!("Deleted post '{}'", post.slug);
        Ok(())
    }

    /// Get a post by ID (any status; the admin path)
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Post>, PostServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get post")
            .map_err(Into::into)
    }

    /// Get a published post by slug (the public path)
    ///
    /// Drafts and archived posts are invisible here. The rendered post is
    /// cached; the view counter increments best-effort on every call.
    pub async fn get_published_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Post>, PostServiceError> {
        let cache_key = format!("posts:slug:{}", slug);

        let post = match self.cache.get::<Post>(&cache_key).await {
            Ok(Some(cached)) => Some(cached),
            _ => {
                let loaded = self
                    .repo
                    .get_by_slug(slug)
                    .await
                    .context("Failed to get post by slug")?
                    .filter(|p| p.status == PostStatus::Published);
                if let Some(ref post) = loaded {
                    let _ = self.cache.set(&cache_key, post, POST_CACHE_TTL).await;
                }
                loaded
            }
        };

        if let Some(ref post) = post {
            // Counting views must never fail a page load
            if let Err(e) = self.repo.increment_view_count(post.id).await {
                tracing::warn!("Failed to count view for '{}': {}", post.slug, e);
            }
        }

        Ok(post)
    }

    /// List posts matching a filter
    ///
    /// Results are cached briefly; any post mutation invalidates them.
    pub async fn list(
        &self,
        filter: &PostFilter,
        params: &ListParams,
    ) -> Result<PagedResult<Post>, PostServiceError> {
        let cache_key = list_cache_key(filter, params);
        if let Ok(Some(cached)) = self.cache.get::<PagedResult<Post>>(&cache_key).await {
            return Ok(cached);
        }

        let result = self
            .repo
            .list(filter, params)
            .await
            .context("Failed to list posts")?;

        let _ = self.cache.set(&cache_key, &result, LIST_CACHE_TTL).await;
        Ok(result)
    }

    /// List published posts carrying a tag
    pub async fn list_by_tag(
        &self,
        tag_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<Post>, PostServiceError> {
        let filter = PostFilter {
            tag_id: Some(tag_id),
            ..PostFilter::published()
        };
        self.list(&filter, params).await
    }

    /// List published posts in a category
    pub async fn list_by_category(
        &self,
        category_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<Post>, PostServiceError> {
        let filter = PostFilter {
            category_id: Some(category_id),
            ..PostFilter::published()
        };
        self.list(&filter, params).await
    }

    /// Replace the tag set of a post with the given names
    ///
    /// Tags are created or reused by name; associations are adjusted to
    /// match exactly the given list.
    pub async fn set_tags(&self, post_id: i64, names: &[String]) -> Result<(), PostServiceError> {
        let mut desired = Vec::new();
        let mut seen = HashSet::new();
        for name in names {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let tag = self
                .tags
                .create_or_get(name)
                .await
                .map_err(|e| PostServiceError::InternalError(anyhow::anyhow!(e)))?;
            if seen.insert(tag.id) {
                desired.push(tag);
            }
        }

        let current = self
            .tags
            .get_by_post_id(post_id)
            .await
            .map_err(|e| PostServiceError::InternalError(anyhow::anyhow!(e)))?;

        let desired_ids: HashSet<i64> = desired.iter().map(|t| t.id).collect();
        let current_ids: HashSet<i64> = current.iter().map(|t| t.id).collect();

        for tag in &current {
            if !desired_ids.contains(&tag.id) {
                self.tags
                    .remove_from_post(tag.id, post_id)
                    .await
                    .map_err(|e| PostServiceError::InternalError(anyhow::anyhow!(e)))?;
            }
        }
        for tag in &desired {
            if !current_ids.contains(&tag.id) {
                self.tags
                    .add_to_post(tag.id, post_id)
                    .await
                    .map_err(|e| PostServiceError::InternalError(anyhow::anyhow!(e)))?;
            }
        }

        Ok(())
    }

    /// Get the tags attached to a post
    pub async fn get_tags(&self, post_id: i64) -> Result<Vec<Tag>, PostServiceError> {
        self.tags
            .get_by_post_id(post_id)
            .await
            .map_err(|e| PostServiceError::InternalError(anyhow::anyhow!(e)))
    }

    /// Extract the table of contents of a post's content
    pub fn table_of_contents(&self, post: &Post) -> Vec<TocEntry> {
        self.renderer.render_with_toc(&post.content).1
    }

    /// Render arbitrary Markdown (admin preview)
    pub fn render_markdown(&self, markdown: &str) -> String {
        self.renderer.render(markdown)
    }

    /// Count posts with the given status
    pub async fn count_by_status(&self, status: PostStatus) -> Result<i64, PostServiceError> {
        self.repo
            .count_by_status(status)
            .await
            .context("Failed to count posts")
            .map_err(Into::into)
    }

    /// Count all posts
    pub async fn count_all(&self) -> Result<i64, PostServiceError> {
        self.repo
            .count_all()
            .await
            .context("Failed to count posts")
            .map_err(Into::into)
    }

    /// Drop a post's cached entries (detail and every list page)
    pub async fn invalidate_post_cache(&self, _id: i64, slug: &str) {
        let _ = self.cache.delete(&format!("posts:slug:{}", slug)).await;
        self.invalidate_list_cache().await;
    }

    async fn invalidate_list_cache(&self) {
        let _ = self.cache.delete_pattern("posts:list:*").await;
        let _ = self.cache.delete_pattern("widgets:*").await;
    }

    /// Resolve a category id, falling back to the default category when
    /// the requested one does not exist.
    async fn resolve_category(&self, category_id: Option<i64>) -> Result<i64, PostServiceError> {
        match category_id {
            Some(id) => {
                let exists = self
                    .category_repo
                    .get_by_id(id)
                    .await
                    .context("Failed to check category")?
                    .is_some();
                if exists {
                    Ok(id)
                } else {
                    tracing::warn!(
                        "Category {} does not exist, falling back to default",
                        id
                    );
                    Ok(DEFAULT_CATEGORY_ID)
                }
            }
            None => Ok(DEFAULT_CATEGORY_ID),
        }
    }

    /// Find a free slug by appending a numeric suffix on collision
    async fn dedupe_slug(
        &self,
        base: &str,
        exclude_id: Option<i64>,
    ) -> Result<String, PostServiceError> {
        if !self
            .repo
            .slug_exists(base, exclude_id)
            .await
            .context("Failed to check slug")?
        {
            return Ok(base.to_string());
        }

        for i in 2..MAX_SLUG_ATTEMPTS {
            let candidate = format!("{}-{}", base, i);
            if !self
                .repo
                .slug_exists(&candidate, exclude_id)
                .await
                .context("Failed to check slug")?
            {
                return Ok(candidate);
            }
        }

        Err(PostServiceError::ValidationError(format!(
            "Could not find a free slug for '{}'",
            base
        )))
    }
}

/// Derive a plain-text excerpt from rendered HTML
fn derive_excerpt(html: &str) -> String {
    let text = TAG_STRIP_RE.replace_all(html, " ");
    let text = WHITESPACE_RE.replace_all(&text, " ");
    let text = text.trim();

    if text.chars().count() <= EXCERPT_MAX_CHARS {
        text.to_string()
    } else {
        let cut: String = text.chars().take(EXCERPT_MAX_CHARS).collect();
        format!("{}…", cut.trim_end())
    }
}

/// Cache key covering every dimension of a list query
fn list_cache_key(filter: &PostFilter, params: &ListParams) -> String {
    format!(
        "posts:list:{}:{}:{}:{}:{}:{}",
        filter
            .status
            .map(|s| s.as_str().to_string())
            .unwrap_or_else(|| "any".to_string()),
        filter.category_id.unwrap_or(0),
        filter.tag_id.unwrap_or(0),
        filter.search.as_deref().unwrap_or(""),
        params.page,
        params.per_page
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::{
        SqlxCategoryRepository, SqlxPostRepository, SqlxTagRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};

    async fn setup_test_service() -> (DynDatabasePool, PostService) {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let cache = create_cache(&CacheConfig::default());
        let tag_service = Arc::new(TagService::new(
            SqlxTagRepository::boxed(pool.clone()),
            cache.clone(),
        ));
        let service = PostService::new(
            SqlxPostRepository::boxed(pool.clone()),
            SqlxCategoryRepository::boxed(pool.clone()),
            tag_service,
            cache,
            MarkdownRenderer::new(),
        );

        (pool, service)
    }

    fn create_input(title: &str) -> CreatePostInput {
        CreatePostInput {
            title: title.to_string(),
            content: "Hello **world**".to_string(),
            ..CreatePostInput::default()
        }
    }

    #[tokio::test]
    async fn test_create_generates_slug_from_title() {
        let (_pool, service) = setup_test_service().await;

        let post = service
            .create(create_input("My First Post"))
            .await
            .expect("Failed to create post");

        assert_eq!(post.slug, "my-first-post");
        assert!(post.content_html.contains("<strong>world</strong>"));
        assert_eq!(post.status, PostStatus::Draft);
        assert_eq!(post.category_id, DEFAULT_CATEGORY_ID);
    }

    #[tokio::test]
    async fn test_create_derives_excerpt() {
        let (_pool, service) = setup_test_service().await;

        let post = service.create(create_input("Excerpted")).await.unwrap();

        assert_eq!(post.excerpt, "Hello world");
    }

    #[tokio::test]
    async fn test_create_empty_title_fails() {
        let (_pool, service) = setup_test_service().await;

        let result = service.create(create_input("   ")).await;
        assert!(matches!(result, Err(PostServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_create_dedupes_slug() {
        let (_pool, service) = setup_test_service().await;

        let first = service.create(create_input("Same Title")).await.unwrap();
        let second = service.create(create_input("Same Title")).await.unwrap();
        let third = service.create(create_input("Same Title")).await.unwrap();

        assert_eq!(first.slug, "same-title");
        assert_eq!(second.slug, "same-title-2");
        assert_eq!(third.slug, "same-title-3");
    }

    #[tokio::test]
    async fn test_create_published_sets_published_at() {
        let (_pool, service) = setup_test_service().await;

        let mut input = create_input("Published Now");
        input.status = Some(PostStatus::Published);
        let post = service.create(input).await.unwrap();

        assert!(post.published_at.is_some());
    }

    #[tokio::test]
    async fn test_create_unknown_category_falls_back() {
        let (_pool, service) = setup_test_service().await;

        let mut input = create_input("Orphaned");
        input.category_id = Some(9999);
        let post = service.create(input).await.unwrap();

        assert_eq!(post.category_id, DEFAULT_CATEGORY_ID);
    }

    #[tokio::test]
    async fn test_create_with_tags() {
        let (_pool, service) = setup_test_service().await;

        let mut input = create_input("Tagged Post");
        input.tags = vec!["rust".to_string(), "web".to_string()];
        let post = service.create(input).await.unwrap();

        let tags = service.get_tags(post.id).await.unwrap();
        assert_eq!(tags.len(), 2);
    }

    #[tokio::test]
    async fn test_update_content_rerenders() {
        let (_pool, service) = setup_test_service().await;
        let post = service.create(create_input("Evolving")).await.unwrap();

        let updated = service
            .update(
                post.id,
                UpdatePostInput {
                    content: Some("New *content*".to_string()),
                    ..UpdatePostInput::default()
                },
            )
            .await
            .unwrap();

        assert!(updated.content_html.contains("<em>content</em>"));
        assert_eq!(updated.excerpt, "New content");
    }

    #[tokio::test]
    async fn test_update_publish_transition_stamps_once() {
        let (_pool, service) = setup_test_service().await;
        let post = service.create(create_input("Draft First")).await.unwrap();
        assert!(post.published_at.is_none());

        let published = service
            .update(
                post.id,
                UpdatePostInput {
                    status: Some(PostStatus::Published),
                    ..UpdatePostInput::default()
                },
            )
            .await
            .unwrap();
        let first_stamp = published.published_at.expect("published_at must be set");

        // Unpublish and re-publish: the original timestamp survives
        service
            .update(
                post.id,
                UpdatePostInput {
                    status: Some(PostStatus::Draft),
                    ..UpdatePostInput::default()
                },
            )
            .await
            .unwrap();
        let republished = service
            .update(
                post.id,
                UpdatePostInput {
                    status: Some(PostStatus::Published),
                    ..UpdatePostInput::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(republished.published_at, Some(first_stamp));
    }

    #[tokio::test]
    async fn test_update_replaces_tags() {
        let (_pool, service) = setup_test_service().await;

        let mut input = create_input("Retagged");
        input.tags = vec!["old".to_string(), "kept".to_string()];
        let post = service.create(input).await.unwrap();

        service
            .update(
                post.id,
                UpdatePostInput {
                    tags: Some(vec!["kept".to_string(), "new".to_string()]),
                    ..UpdatePostInput::default()
                },
            )
            .await
            .unwrap();

        let tags = service.get_tags(post.id).await.unwrap();
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tags.len(), 2);
        assert!(names.contains(&"kept"));
        assert!(names.contains(&"new"));
        assert!(!names.contains(&"old"));
    }

    #[tokio::test]
    async fn test_update_missing_post() {
        let (_pool, service) = setup_test_service().await;

        let result = service
            .update(
                9999,
                UpdatePostInput {
                    title: Some("Nope".to_string()),
                    ..UpdatePostInput::default()
                },
            )
            .await;
        assert!(matches!(result, Err(PostServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_no_changes() {
        let (_pool, service) = setup_test_service().await;
        let post = service.create(create_input("Static")).await.unwrap();

        let result = service.update(post.id, UpdatePostInput::default()).await;
        assert!(matches!(result, Err(PostServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_get_published_by_slug_hides_drafts() {
        let (_pool, service) = setup_test_service().await;
        service.create(create_input("Hidden Draft")).await.unwrap();

        let found = service
            .get_published_by_slug("hidden-draft")
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_get_published_by_slug_counts_views() {
        let (_pool, service) = setup_test_service().await;

        let mut input = create_input("Popular");
        input.status = Some(PostStatus::Published);
        let post = service.create(input).await.unwrap();

        service.get_published_by_slug("popular").await.unwrap();
        service.get_published_by_slug("popular").await.unwrap();

        let reloaded = service.get_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(reloaded.view_count, 2);
    }

    #[tokio::test]
    async fn test_delete() {
        let (_pool, service) = setup_test_service().await;
        let post = service.create(create_input("Doomed")).await.unwrap();

        service.delete(post.id).await.unwrap();

        assert!(service.get_by_id(post.id).await.unwrap().is_none());
        assert!(matches!(
            service.delete(post.id).await,
            Err(PostServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_table_of_contents() {
        let (_pool, service) = setup_test_service().await;

        let mut input = create_input("With Headings");
        input.content = "# One\n\ntext\n\n## Two".to_string();
        let post = service.create(input).await.unwrap();

        let toc = service.table_of_contents(&post);
        assert_eq!(toc.len(), 2);
        assert_eq!(toc[0].text, "One");
        assert_eq!(toc[1].level, 2);
    }

    #[test]
    fn test_derive_excerpt_strips_tags() {
        let excerpt = derive_excerpt("<p>Hello <strong>world</strong></p>");
        assert_eq!(excerpt, "Hello world");
    }

    #[test]
    fn test_derive_excerpt_truncates() {
        let long = format!("<p>{}</p>", "word ".repeat(100));
        let excerpt = derive_excerpt(&long);
        assert!(excerpt.chars().count() <= EXCERPT_MAX_CHARS + 1);
        assert!(excerpt.ends_with('…'));
    }
}
