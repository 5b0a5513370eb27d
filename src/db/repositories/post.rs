//! Post repository
//!
//! Database operations for posts: CRUD, filtered pagination, slug
//! collision checks, and the view counter.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ListParams, PagedResult, Post, PostFilter, PostStatus};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row, SqlitePool};
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a new post
    async fn create(&self, post: &Post) -> Result<Post>;

    /// Get post by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Get post by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>>;

    /// Persist all mutable fields of a post
    async fn update(&self, post: &Post) -> Result<()>;

    /// Delete a post (tags and comments cascade)
    async fn delete(&self, id: i64) -> Result<()>;

    /// List posts matching a filter, newest first with pinned posts on top
    async fn list(&self, filter: &PostFilter, params: &ListParams) -> Result<PagedResult<Post>>;

    /// Check whether a slug is taken, optionally excluding one post
    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Increment the view counter
    async fn increment_view_count(&self, id: i64) -> Result<()>;

    /// Count posts with the given status
    async fn count_by_status(&self, status: PostStatus) -> Result<i64>;

    /// Count all posts
    async fn count_all(&self) -> Result<i64>;
}

/// SQLx-based post repository implementation
///
/// Supports both SQLite and PostgreSQL databases.
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    /// Create a new SQLx post repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), post).await,
            DatabaseDriver::Postgres => {
                create_postgres(self.pool.as_postgres().unwrap(), post).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Postgres => {
                get_by_id_postgres(self.pool.as_postgres().unwrap(), id).await
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Postgres => {
                get_by_slug_postgres(self.pool.as_postgres().unwrap(), slug).await
            }
        }
    }

    async fn update(&self, post: &Post) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_sqlite(self.pool.as_sqlite().unwrap(), post).await,
            DatabaseDriver::Postgres => {
                update_postgres(self.pool.as_postgres().unwrap(), post).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Postgres => delete_postgres(self.pool.as_postgres().unwrap(), id).await,
        }
    }

    async fn list(&self, filter: &PostFilter, params: &ListParams) -> Result<PagedResult<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_sqlite(self.pool.as_sqlite().unwrap(), filter, params).await
            }
            DatabaseDriver::Postgres => {
                list_postgres(self.pool.as_postgres().unwrap(), filter, params).await
            }
        }
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                slug_exists_sqlite(self.pool.as_sqlite().unwrap(), slug, exclude_id).await
            }
            DatabaseDriver::Postgres => {
                slug_exists_postgres(self.pool.as_postgres().unwrap(), slug, exclude_id).await
            }
        }
    }

    async fn increment_view_count(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                increment_view_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Postgres => {
                increment_view_postgres(self.pool.as_postgres().unwrap(), id).await
            }
        }
    }

    async fn count_by_status(&self, status: PostStatus) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_by_status_sqlite(self.pool.as_sqlite().unwrap(), status).await
            }
            DatabaseDriver::Postgres => {
                count_by_status_postgres(self.pool.as_postgres().unwrap(), status).await
            }
        }
    }

    async fn count_all(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_all_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Postgres => count_all_postgres(self.pool.as_postgres().unwrap()).await,
        }
    }
}

const POST_COLUMNS: &str = "id, slug, title, content, content_html, excerpt, category_id, \
     status, published_at, created_at, updated_at, view_count, comment_count, thumbnail, \
     is_pinned, pin_order";

/// Ordering shared by every list query: pinned posts first (by pin order),
/// then newest by publication date, falling back to creation date for drafts.
const LIST_ORDER: &str =
    "ORDER BY p.is_pinned DESC, p.pin_order ASC, COALESCE(p.published_at, p.created_at) DESC";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, post: &Post) -> Result<Post> {
    let result = sqlx::query(
        r#"
        INSERT INTO posts (slug, title, content, content_html, excerpt, category_id, status,
                           published_at, created_at, updated_at, view_count, comment_count,
                           thumbnail, is_pinned, pin_order)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.slug)
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.content_html)
    .bind(&post.excerpt)
    .bind(post.category_id)
    .bind(post.status.as_str())
    .bind(post.published_at)
    .bind(post.created_at)
    .bind(post.updated_at)
    .bind(post.view_count)
    .bind(post.comment_count)
    .bind(&post.thumbnail)
    .bind(post.is_pinned)
    .bind(post.pin_order)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    let mut created = post.clone();
    created.id = result.last_insert_rowid();
    Ok(created)
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Post>> {
    let sql = format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by id")?;

    match row {
        Some(row) => Ok(Some(row_to_post_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn get_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Post>> {
    let sql = format!("SELECT {} FROM posts WHERE slug = ?", POST_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_post_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn update_sqlite(pool: &SqlitePool, post: &Post) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE posts
        SET slug = ?, title = ?, content = ?, content_html = ?, excerpt = ?, category_id = ?,
            status = ?, published_at = ?, updated_at = ?, thumbnail = ?, is_pinned = ?,
            pin_order = ?
        WHERE id = ?
        "#,
    )
    .bind(&post.slug)
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.content_html)
    .bind(&post.excerpt)
    .bind(post.category_id)
    .bind(post.status.as_str())
    .bind(post.published_at)
    .bind(post.updated_at)
    .bind(&post.thumbnail)
    .bind(post.is_pinned)
    .bind(post.pin_order)
    .bind(post.id)
    .execute(pool)
    .await
    .context("Failed to update post")?;
    Ok(())
}

async fn delete_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete post")?;
    Ok(())
}

/// Build the WHERE clause for a post filter.
///
/// Both drivers share the same clause structure; only the placeholder
/// syntax differs, so the caller passes a placeholder generator.
fn build_filter_sql(filter: &PostFilter, mut placeholder: impl FnMut() -> String) -> String {
    let mut clauses: Vec<String> = Vec::new();

    if filter.status.is_some() {
        clauses.push(format!("p.status = {}", placeholder()));
    }
    if filter.category_id.is_some() {
        clauses.push(format!("p.category_id = {}", placeholder()));
    }
    if filter.tag_id.is_some() {
        clauses.push(format!(
            "p.id IN (SELECT post_id FROM post_tags WHERE tag_id = {})",
            placeholder()
        ));
    }
    if filter.search.is_some() {
        let a = placeholder();
        let b = placeholder();
        clauses.push(format!("(p.title LIKE {} OR p.content LIKE {})", a, b));
    }

    if clauses.is_empty() {
        String::from("1 = 1")
    } else {
        clauses.join(" AND ")
    }
}

async fn list_sqlite(
    pool: &SqlitePool,
    filter: &PostFilter,
    params: &ListParams,
) -> Result<PagedResult<Post>> {
    let where_sql = build_filter_sql(filter, || "?".to_string());
    let search_like = filter.search.as_ref().map(|s| format!("%{}%", s));

    let count_sql = format!("SELECT COUNT(*) as count FROM posts p WHERE {}", where_sql);
    let mut count_query = sqlx::query(&count_sql);
    if let Some(status) = filter.status {
        count_query = count_query.bind(status.as_str());
    }
    if let Some(category_id) = filter.category_id {
        count_query = count_query.bind(category_id);
    }
    if let Some(tag_id) = filter.tag_id {
        count_query = count_query.bind(tag_id);
    }
    if let Some(ref like) = search_like {
        count_query = count_query.bind(like.clone()).bind(like.clone());
    }
    let count_row = count_query
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;
    let total: i64 = count_row.get("count");

    let list_sql = format!(
        "SELECT {} FROM posts p WHERE {} {} LIMIT ? OFFSET ?",
        POST_COLUMNS, where_sql, LIST_ORDER
    );
    let mut list_query = sqlx::query(&list_sql);
    if let Some(status) = filter.status {
        list_query = list_query.bind(status.as_str());
    }
    if let Some(category_id) = filter.category_id {
        list_query = list_query.bind(category_id);
    }
    if let Some(tag_id) = filter.tag_id {
        list_query = list_query.bind(tag_id);
    }
    if let Some(ref like) = search_like {
        list_query = list_query.bind(like.clone()).bind(like.clone());
    }
    list_query = list_query.bind(params.limit()).bind(params.offset());

    let rows = list_query
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    let mut posts = Vec::new();
    for row in rows {
        posts.push(row_to_post_sqlite(&row)?);
    }

    Ok(PagedResult::new(posts, total, params))
}

async fn slug_exists_sqlite(
    pool: &SqlitePool,
    slug: &str,
    exclude_id: Option<i64>,
) -> Result<bool> {
    let row = match exclude_id {
        Some(id) => {
            sqlx::query("SELECT COUNT(*) as count FROM posts WHERE slug = ? AND id != ?")
                .bind(slug)
                .bind(id)
                .fetch_one(pool)
                .await
        }
        None => {
            sqlx::query("SELECT COUNT(*) as count FROM posts WHERE slug = ?")
                .bind(slug)
                .fetch_one(pool)
                .await
        }
    }
    .context("Failed to check slug")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn increment_view_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("UPDATE posts SET view_count = view_count + 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to increment view count")?;
    Ok(())
}

async fn count_by_status_sqlite(pool: &SqlitePool, status: PostStatus) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM posts WHERE status = ?")
        .bind(status.as_str())
        .fetch_one(pool)
        .await
        .context("Failed to count posts by status")?;
    Ok(row.get("count"))
}

async fn count_all_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM posts")
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;
    Ok(row.get("count"))
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    let status_str: String = row.get("status");
    let status = PostStatus::parse(&status_str)
        .ok_or_else(|| anyhow!("Invalid post status in database: {}", status_str))?;

    Ok(Post {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        excerpt: row.get("excerpt"),
        category_id: row.get("category_id"),
        status,
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        view_count: row.get("view_count"),
        comment_count: row.get("comment_count"),
        thumbnail: row.get("thumbnail"),
        is_pinned: row.get("is_pinned"),
        pin_order: row.get("pin_order"),
    })
}

// ============================================================================
// PostgreSQL implementations
// ============================================================================

async fn create_postgres(pool: &PgPool, post: &Post) -> Result<Post> {
    let row = sqlx::query(
        r#"
        INSERT INTO posts (slug, title, content, content_html, excerpt, category_id, status,
                           published_at, created_at, updated_at, view_count, comment_count,
                           thumbnail, is_pinned, pin_order)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING id
        "#,
    )
    .bind(&post.slug)
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.content_html)
    .bind(&post.excerpt)
    .bind(post.category_id)
    .bind(post.status.as_str())
    .bind(post.published_at)
    .bind(post.created_at)
    .bind(post.updated_at)
    .bind(post.view_count)
    .bind(post.comment_count)
    .bind(&post.thumbnail)
    .bind(post.is_pinned)
    .bind(post.pin_order)
    .fetch_one(pool)
    .await
    .context("Failed to create post")?;

    let mut created = post.clone();
    created.id = row.get("id");
    Ok(created)
}

async fn get_by_id_postgres(pool: &PgPool, id: i64) -> Result<Option<Post>> {
    let sql = format!("SELECT {} FROM posts WHERE id = $1", POST_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by id")?;

    match row {
        Some(row) => Ok(Some(row_to_post_postgres(&row)?)),
        None => Ok(None),
    }
}

async fn get_by_slug_postgres(pool: &PgPool, slug: &str) -> Result<Option<Post>> {
    let sql = format!("SELECT {} FROM posts WHERE slug = $1", POST_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_post_postgres(&row)?)),
        None => Ok(None),
    }
}

async fn update_postgres(pool: &PgPool, post: &Post) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE posts
        SET slug = $1, title = $2, content = $3, content_html = $4, excerpt = $5,
            category_id = $6, status = $7, published_at = $8, updated_at = $9,
            thumbnail = $10, is_pinned = $11, pin_order = $12
        WHERE id = $13
        "#,
    )
    .bind(&post.slug)
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.content_html)
    .bind(&post.excerpt)
    .bind(post.category_id)
    .bind(post.status.as_str())
    .bind(post.published_at)
    .bind(post.updated_at)
    .bind(&post.thumbnail)
    .bind(post.is_pinned)
    .bind(post.pin_order)
    .bind(post.id)
    .execute(pool)
    .await
    .context("Failed to update post")?;
    Ok(())
}

async fn delete_postgres(pool: &PgPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete post")?;
    Ok(())
}

async fn list_postgres(
    pool: &PgPool,
    filter: &PostFilter,
    params: &ListParams,
) -> Result<PagedResult<Post>> {
    let search_like = filter.search.as_ref().map(|s| format!("%{}%", s));

    let mut idx = 0usize;
    let where_sql = build_filter_sql(filter, || {
        idx += 1;
        format!("${}", idx)
    });

    let count_sql = format!("SELECT COUNT(*) as count FROM posts p WHERE {}", where_sql);
    let mut count_query = sqlx::query(&count_sql);
    if let Some(status) = filter.status {
        count_query = count_query.bind(status.as_str());
    }
    if let Some(category_id) = filter.category_id {
        count_query = count_query.bind(category_id);
    }
    if let Some(tag_id) = filter.tag_id {
        count_query = count_query.bind(tag_id);
    }
    if let Some(ref like) = search_like {
        count_query = count_query.bind(like.clone()).bind(like.clone());
    }
    let count_row = count_query
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;
    let total: i64 = count_row.get("count");

    let list_sql = format!(
        "SELECT {} FROM posts p WHERE {} {} LIMIT ${} OFFSET ${}",
        POST_COLUMNS,
        where_sql,
        LIST_ORDER,
        idx + 1,
        idx + 2
    );
    let mut list_query = sqlx::query(&list_sql);
    if let Some(status) = filter.status {
        list_query = list_query.bind(status.as_str());
    }
    if let Some(category_id) = filter.category_id {
        list_query = list_query.bind(category_id);
    }
    if let Some(tag_id) = filter.tag_id {
        list_query = list_query.bind(tag_id);
    }
    if let Some(ref like) = search_like {
        list_query = list_query.bind(like.clone()).bind(like.clone());
    }
    list_query = list_query.bind(params.limit()).bind(params.offset());

    let rows = list_query
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    let mut posts = Vec::new();
    for row in rows {
        posts.push(row_to_post_postgres(&row)?);
    }

    Ok(PagedResult::new(posts, total, params))
}

async fn slug_exists_postgres(pool: &PgPool, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
    let row = match exclude_id {
        Some(id) => {
            sqlx::query("SELECT COUNT(*) as count FROM posts WHERE slug = $1 AND id != $2")
                .bind(slug)
                .bind(id)
                .fetch_one(pool)
                .await
        }
        None => {
            sqlx::query("SELECT COUNT(*) as count FROM posts WHERE slug = $1")
                .bind(slug)
                .fetch_one(pool)
                .await
        }
    }
    .context("Failed to check slug")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn increment_view_postgres(pool: &PgPool, id: i64) -> Result<()> {
    sqlx::query("UPDATE posts SET view_count = view_count + 1 WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to increment view count")?;
    Ok(())
}

async fn count_by_status_postgres(pool: &PgPool, status: PostStatus) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM posts WHERE status = $1")
        .bind(status.as_str())
        .fetch_one(pool)
        .await
        .context("Failed to count posts by status")?;
    Ok(row.get("count"))
}

async fn count_all_postgres(pool: &PgPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM posts")
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;
    Ok(row.get("count"))
}

fn row_to_post_postgres(row: &sqlx::postgres::PgRow) -> Result<Post> {
    let status_str: String = row.get("status");
    let status = PostStatus::parse(&status_str)
        .ok_or_else(|| anyhow!("Invalid post status in database: {}", status_str))?;

    Ok(Post {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        excerpt: row.get("excerpt"),
        category_id: row.get("category_id"),
        status,
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        view_count: row.get("view_count"),
        comment_count: row.get("comment_count"),
        thumbnail: row.get("thumbnail"),
        is_pinned: row.get("is_pinned"),
        pin_order: row.get("pin_order"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use chrono::Utc;

    async fn setup_test_repo() -> (DynDatabasePool, SqlxPostRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxPostRepository::new(pool.clone());
        (pool, repo)
    }

    fn sample_post(slug: &str, status: PostStatus) -> Post {
        Post::new(
            slug.to_string(),
            format!("Title for {}", slug),
            "Some **markdown** content".to_string(),
            "<p>Some <strong>markdown</strong> content</p>".to_string(),
            "Some markdown content".to_string(),
            1,
            status,
        )
    }

    #[tokio::test]
    async fn test_create_post() {
        let (_pool, repo) = setup_test_repo().await;

        let created = repo
            .create(&sample_post("hello-world", PostStatus::Draft))
            .await
            .expect("Failed to create post");

        assert!(created.id > 0);
        assert_eq!(created.slug, "hello-world");
        assert_eq!(created.status, PostStatus::Draft);
    }

    #[tokio::test]
    async fn test_get_by_slug() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&sample_post("findable", PostStatus::Published))
            .await
            .unwrap();

        let found = repo
            .get_by_slug("findable")
            .await
            .expect("Failed to get post")
            .expect("Post not found");

        assert_eq!(found.slug, "findable");
        assert!(found.published_at.is_some());
    }

    #[tokio::test]
    async fn test_get_by_slug_not_found() {
        let (_pool, repo) = setup_test_repo().await;

        let found = repo.get_by_slug("missing").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_update_post() {
        let (_pool, repo) = setup_test_repo().await;
        let mut post = repo
            .create(&sample_post("to-update", PostStatus::Draft))
            .await
            .unwrap();

        post.title = "Updated Title".to_string();
        post.status = PostStatus::Published;
        post.published_at = Some(Utc::now());
        repo.update(&post).await.expect("Failed to update post");

        let reloaded = repo.get_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(reloaded.title, "Updated Title");
        assert_eq!(reloaded.status, PostStatus::Published);
        assert!(reloaded.published_at.is_some());
    }

    #[tokio::test]
    async fn test_delete_post() {
        let (_pool, repo) = setup_test_repo().await;
        let post = repo
            .create(&sample_post("doomed", PostStatus::Draft))
            .await
            .unwrap();

        repo.delete(post.id).await.expect("Failed to delete post");

        assert!(repo.get_by_id(post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let (_pool, repo) = setup_test_repo().await;

        repo.create(&sample_post("published-1", PostStatus::Published))
            .await
            .unwrap();
        repo.create(&sample_post("published-2", PostStatus::Published))
            .await
            .unwrap();
        repo.create(&sample_post("draft-1", PostStatus::Draft))
            .await
            .unwrap();

        let result = repo
            .list(&PostFilter::published(), &ListParams::default())
            .await
            .expect("Failed to list posts");

        assert_eq!(result.total, 2);
        assert!(result
            .items
            .iter()
            .all(|p| p.status == PostStatus::Published));
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let (_pool, repo) = setup_test_repo().await;

        for i in 0..15 {
            repo.create(&sample_post(&format!("post-{}", i), PostStatus::Published))
                .await
                .unwrap();
        }

        let page1 = repo
            .list(&PostFilter::published(), &ListParams::new(1, 10))
            .await
            .unwrap();
        let page2 = repo
            .list(&PostFilter::published(), &ListParams::new(2, 10))
            .await
            .unwrap();

        assert_eq!(page1.total, 15);
        assert_eq!(page1.items.len(), 10);
        assert_eq!(page2.items.len(), 5);
        assert!(page1.has_next());
        assert!(!page2.has_next());
    }

    #[tokio::test]
    async fn test_list_pinned_posts_first() {
        let (_pool, repo) = setup_test_repo().await;

        repo.create(&sample_post("ordinary", PostStatus::Published))
            .await
            .unwrap();
        let mut pinned = repo
            .create(&sample_post("pinned", PostStatus::Published))
            .await
            .unwrap();
        pinned.is_pinned = true;
        repo.update(&pinned).await.unwrap();

        let result = repo
            .list(&PostFilter::published(), &ListParams::default())
            .await
            .unwrap();

        assert_eq!(result.items[0].slug, "pinned");
    }

    #[tokio::test]
    async fn test_list_search() {
        let (_pool, repo) = setup_test_repo().await;

        let mut post = sample_post("about-rust", PostStatus::Published);
        post.title = "All about Rust".to_string();
        repo.create(&post).await.unwrap();
        repo.create(&sample_post("unrelated", PostStatus::Published))
            .await
            .unwrap();

        let filter = PostFilter {
            search: Some("Rust".to_string()),
            ..PostFilter::published()
        };
        let result = repo.list(&filter, &ListParams::default()).await.unwrap();

        assert_eq!(result.total, 1);
        assert_eq!(result.items[0].slug, "about-rust");
    }

    #[tokio::test]
    async fn test_list_filter_by_tag() {
        let (pool, repo) = setup_test_repo().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        let tagged = repo
            .create(&sample_post("tagged", PostStatus::Published))
            .await
            .unwrap();
        repo.create(&sample_post("untagged", PostStatus::Published))
            .await
            .unwrap();

        sqlx::query("INSERT INTO tags (slug, name) VALUES ('rust', 'Rust')")
            .execute(sqlite_pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO post_tags (post_id, tag_id) VALUES (?, 1)")
            .bind(tagged.id)
            .execute(sqlite_pool)
            .await
            .unwrap();

        let filter = PostFilter {
            tag_id: Some(1),
            ..PostFilter::published()
        };
        let result = repo.list(&filter, &ListParams::default()).await.unwrap();

        assert_eq!(result.total, 1);
        assert_eq!(result.items[0].slug, "tagged");
    }

    #[tokio::test]
    async fn test_slug_exists() {
        let (_pool, repo) = setup_test_repo().await;
        let post = repo
            .create(&sample_post("taken", PostStatus::Draft))
            .await
            .unwrap();

        assert!(repo.slug_exists("taken", None).await.unwrap());
        assert!(!repo.slug_exists("free", None).await.unwrap());
        // Excluding the owning post itself reports the slug as free
        assert!(!repo.slug_exists("taken", Some(post.id)).await.unwrap());
    }

    #[tokio::test]
    async fn test_increment_view_count() {
        let (_pool, repo) = setup_test_repo().await;
        let post = repo
            .create(&sample_post("viewed", PostStatus::Published))
            .await
            .unwrap();

        repo.increment_view_count(post.id).await.unwrap();
        repo.increment_view_count(post.id).await.unwrap();

        let reloaded = repo.get_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(reloaded.view_count, 2);
    }

    #[tokio::test]
    async fn test_count_by_status() {
        let (_pool, repo) = setup_test_repo().await;

        repo.create(&sample_post("p1", PostStatus::Published))
            .await
            .unwrap();
        repo.create(&sample_post("d1", PostStatus::Draft))
            .await
            .unwrap();
        repo.create(&sample_post("d2", PostStatus::Draft))
            .await
            .unwrap();

        assert_eq!(
            repo.count_by_status(PostStatus::Published).await.unwrap(),
            1
        );
        assert_eq!(repo.count_by_status(PostStatus::Draft).await.unwrap(), 2);
        assert_eq!(repo.count_all().await.unwrap(), 3);
    }
}
