//! Tag repository
//!
//! Database operations for tags: CRUD, post associations, usage counts,
//! and the bulk reassignment that backs tag merging.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Tag, TagWithCount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, SqlitePool};
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a new tag
    async fn create(&self, tag: &Tag) -> Result<Tag>;

    /// Get tag by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    /// Get tag by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>>;

    /// Get tag by name
    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>>;

    /// List all tags ordered by name
    async fn list(&self) -> Result<Vec<Tag>>;

    /// Get tags with post counts, sorted by count descending.
    /// `limit = 0` returns every tag (used by duplicate detection).
    async fn get_with_counts(&self, limit: usize) -> Result<Vec<TagWithCount>>;

    /// Delete a tag
    async fn delete(&self, id: i64) -> Result<()>;

    /// Associate tag with post
    async fn add_to_post(&self, tag_id: i64, post_id: i64) -> Result<()>;

    /// Remove tag from post
    async fn remove_from_post(&self, tag_id: i64, post_id: i64) -> Result<()>;

    /// Get tags for a post
    async fn get_by_post_id(&self, post_id: i64) -> Result<Vec<Tag>>;

    /// Move every association of `source_id` onto `target_id`, skipping
    /// posts already tagged with the target, then drop the source's
    /// associations. The source tag row itself is left for the caller.
    async fn reassign_posts(&self, source_id: i64, target_id: i64) -> Result<()>;
}

/// SQLx-based tag repository implementation
///
/// Supports both SQLite and PostgreSQL databases.
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, tag: &Tag) -> Result<Tag> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_tag_sqlite(self.pool.as_sqlite().unwrap(), tag).await,
            DatabaseDriver::Postgres => {
                create_tag_postgres(self.pool.as_postgres().unwrap(), tag).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_tag_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Postgres => {
                get_tag_by_id_postgres(self.pool.as_postgres().unwrap(), id).await
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_tag_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Postgres => {
                get_tag_by_slug_postgres(self.pool.as_postgres().unwrap(), slug).await
            }
        }
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_tag_by_name_sqlite(self.pool.as_sqlite().unwrap(), name).await
            }
            DatabaseDriver::Postgres => {
                get_tag_by_name_postgres(self.pool.as_postgres().unwrap(), name).await
            }
        }
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_tags_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Postgres => list_tags_postgres(self.pool.as_postgres().unwrap()).await,
        }
    }

    async fn get_with_counts(&self, limit: usize) -> Result<Vec<TagWithCount>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_tags_with_counts_sqlite(self.pool.as_sqlite().unwrap(), limit).await
            }
            DatabaseDriver::Postgres => {
                get_tags_with_counts_postgres(self.pool.as_postgres().unwrap(), limit).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_tag_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Postgres => {
                delete_tag_postgres(self.pool.as_postgres().unwrap(), id).await
            }
        }
    }

    async fn add_to_post(&self, tag_id: i64, post_id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                add_tag_to_post_sqlite(self.pool.as_sqlite().unwrap(), tag_id, post_id).await
            }
            DatabaseDriver::Postgres => {
                add_tag_to_post_postgres(self.pool.as_postgres().unwrap(), tag_id, post_id).await
            }
        }
    }

    async fn remove_from_post(&self, tag_id: i64, post_id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                remove_tag_from_post_sqlite(self.pool.as_sqlite().unwrap(), tag_id, post_id).await
            }
            DatabaseDriver::Postgres => {
                remove_tag_from_post_postgres(self.pool.as_postgres().unwrap(), tag_id, post_id)
                    .await
            }
        }
    }

    async fn get_by_post_id(&self, post_id: i64) -> Result<Vec<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_tags_by_post_sqlite(self.pool.as_sqlite().unwrap(), post_id).await
            }
            DatabaseDriver::Postgres => {
                get_tags_by_post_postgres(self.pool.as_postgres().unwrap(), post_id).await
            }
        }
    }

    async fn reassign_posts(&self, source_id: i64, target_id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                reassign_posts_sqlite(self.pool.as_sqlite().unwrap(), source_id, target_id).await
            }
            DatabaseDriver::Postgres => {
                reassign_posts_postgres(self.pool.as_postgres().unwrap(), source_id, target_id)
                    .await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_tag_sqlite(pool: &SqlitePool, tag: &Tag) -> Result<Tag> {
    let now = Utc::now();

    let result = sqlx::query("INSERT INTO tags (slug, name, created_at) VALUES (?, ?, ?)")
        .bind(&tag.slug)
        .bind(&tag.name)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_rowid(),
        slug: tag.slug.clone(),
        name: tag.name.clone(),
        created_at: now,
    })
}

async fn get_tag_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, slug, name, created_at FROM tags WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by id")?;

    match row {
        Some(row) => Ok(Some(row_to_tag_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn get_tag_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, slug, name, created_at FROM tags WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_tag_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn get_tag_by_name_sqlite(pool: &SqlitePool, name: &str) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, slug, name, created_at FROM tags WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by name")?;

    match row {
        Some(row) => Ok(Some(row_to_tag_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_tags_sqlite(pool: &SqlitePool) -> Result<Vec<Tag>> {
    let rows = sqlx::query("SELECT id, slug, name, created_at FROM tags ORDER BY name")
        .fetch_all(pool)
        .await
        .context("Failed to list tags")?;

    let mut tags = Vec::new();
    for row in rows {
        tags.push(row_to_tag_sqlite(&row)?);
    }
    Ok(tags)
}

async fn get_tags_with_counts_sqlite(
    pool: &SqlitePool,
    limit: usize,
) -> Result<Vec<TagWithCount>> {
    let limit = if limit == 0 { i64::MAX } else { limit as i64 };
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.slug, t.name, t.created_at, COUNT(pt.post_id) as post_count
        FROM tags t
        LEFT JOIN post_tags pt ON t.id = pt.tag_id
        GROUP BY t.id, t.slug, t.name, t.created_at
        ORDER BY post_count DESC, t.name ASC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to get tags with counts")?;

    let mut tags_with_counts = Vec::new();
    for row in rows {
        let tag = row_to_tag_sqlite(&row)?;
        let post_count: i64 = row.get("post_count");
        tags_with_counts.push(TagWithCount::new(tag, post_count));
    }
    Ok(tags_with_counts)
}

async fn delete_tag_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    // post_tags entries go away via ON DELETE CASCADE
    sqlx::query("DELETE FROM tags WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete tag")?;
    Ok(())
}

async fn add_tag_to_post_sqlite(pool: &SqlitePool, tag_id: i64, post_id: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)")
        .bind(post_id)
        .bind(tag_id)
        .execute(pool)
        .await
        .context("Failed to add tag to post")?;
    Ok(())
}

async fn remove_tag_from_post_sqlite(pool: &SqlitePool, tag_id: i64, post_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM post_tags WHERE post_id = ? AND tag_id = ?")
        .bind(post_id)
        .bind(tag_id)
        .execute(pool)
        .await
        .context("Failed to remove tag from post")?;
    Ok(())
}

async fn get_tags_by_post_sqlite(pool: &SqlitePool, post_id: i64) -> Result<Vec<Tag>> {
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.slug, t.name, t.created_at
        FROM tags t
        INNER JOIN post_tags pt ON t.id = pt.tag_id
        WHERE pt.post_id = ?
        ORDER BY t.name
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await
    .context("Failed to get tags by post")?;

    let mut tags = Vec::new();
    for row in rows {
        tags.push(row_to_tag_sqlite(&row)?);
    }
    Ok(tags)
}

async fn reassign_posts_sqlite(pool: &SqlitePool, source_id: i64, target_id: i64) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(
        "INSERT OR IGNORE INTO post_tags (post_id, tag_id)
         SELECT post_id, ? FROM post_tags WHERE tag_id = ?",
    )
    .bind(target_id)
    .bind(source_id)
    .execute(&mut *tx)
    .await
    .context("Failed to copy tag associations")?;

    sqlx::query("DELETE FROM post_tags WHERE tag_id = ?")
        .bind(source_id)
        .execute(&mut *tx)
        .await
        .context("Failed to drop source tag associations")?;

    tx.commit().await.context("Failed to commit reassignment")?;
    Ok(())
}

fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Tag> {
    Ok(Tag {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// PostgreSQL implementations
// ============================================================================

async fn create_tag_postgres(pool: &PgPool, tag: &Tag) -> Result<Tag> {
    let now = Utc::now();

    let row = sqlx::query(
        "INSERT INTO tags (slug, name, created_at) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(&tag.slug)
    .bind(&tag.name)
    .bind(now)
    .fetch_one(pool)
    .await
    .context("Failed to create tag")?;

    Ok(Tag {
        id: row.get("id"),
        slug: tag.slug.clone(),
        name: tag.name.clone(),
        created_at: now,
    })
}

async fn get_tag_by_id_postgres(pool: &PgPool, id: i64) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, slug, name, created_at FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by id")?;

    match row {
        Some(row) => Ok(Some(row_to_tag_postgres(&row)?)),
        None => Ok(None),
    }
}

async fn get_tag_by_slug_postgres(pool: &PgPool, slug: &str) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, slug, name, created_at FROM tags WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_tag_postgres(&row)?)),
        None => Ok(None),
    }
}

async fn get_tag_by_name_postgres(pool: &PgPool, name: &str) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, slug, name, created_at FROM tags WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by name")?;

    match row {
        Some(row) => Ok(Some(row_to_tag_postgres(&row)?)),
        None => Ok(None),
    }
}

async fn list_tags_postgres(pool: &PgPool) -> Result<Vec<Tag>> {
    let rows = sqlx::query("SELECT id, slug, name, created_at FROM tags ORDER BY name")
        .fetch_all(pool)
        .await
        .context("Failed to list tags")?;

    let mut tags = Vec::new();
    for row in rows {
        tags.push(row_to_tag_postgres(&row)?);
    }
    Ok(tags)
}

async fn get_tags_with_counts_postgres(pool: &PgPool, limit: usize) -> Result<Vec<TagWithCount>> {
    let limit = if limit == 0 { i64::MAX } else { limit as i64 };
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.slug, t.name, t.created_at, COUNT(pt.post_id) as post_count
        FROM tags t
        LEFT JOIN post_tags pt ON t.id = pt.tag_id
        GROUP BY t.id, t.slug, t.name, t.created_at
        ORDER BY post_count DESC, t.name ASC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to get tags with counts")?;

    let mut tags_with_counts = Vec::new();
    for row in rows {
        let tag = row_to_tag_postgres(&row)?;
        let post_count: i64 = row.get("post_count");
        tags_with_counts.push(TagWithCount::new(tag, post_count));
    }
    Ok(tags_with_counts)
}

async fn delete_tag_postgres(pool: &PgPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM tags WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete tag")?;
    Ok(())
}

async fn add_tag_to_post_postgres(pool: &PgPool, tag_id: i64, post_id: i64) -> Result<()> {
    sqlx::query(
        "INSERT INTO post_tags (post_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(post_id)
    .bind(tag_id)
    .execute(pool)
    .await
    .context("Failed to add tag to post")?;
    Ok(())
}

async fn remove_tag_from_post_postgres(pool: &PgPool, tag_id: i64, post_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM post_tags WHERE post_id = $1 AND tag_id = $2")
        .bind(post_id)
        .bind(tag_id)
        .execute(pool)
        .await
        .context("Failed to remove tag from post")?;
    Ok(())
}

async fn get_tags_by_post_postgres(pool: &PgPool, post_id: i64) -> Result<Vec<Tag>> {
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.slug, t.name, t.created_at
        FROM tags t
        INNER JOIN post_tags pt ON t.id = pt.tag_id
        WHERE pt.post_id = $1
        ORDER BY t.name
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await
    .context("Failed to get tags by post")?;

    let mut tags = Vec::new();
    for row in rows {
        tags.push(row_to_tag_postgres(&row)?);
    }
    Ok(tags)
}

async fn reassign_posts_postgres(pool: &PgPool, source_id: i64, target_id: i64) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(
        "INSERT INTO post_tags (post_id, tag_id)
         SELECT post_id, $1 FROM post_tags WHERE tag_id = $2
         ON CONFLICT DO NOTHING",
    )
    .bind(target_id)
    .bind(source_id)
    .execute(&mut *tx)
    .await
    .context("Failed to copy tag associations")?;

    sqlx::query("DELETE FROM post_tags WHERE tag_id = $1")
        .bind(source_id)
        .execute(&mut *tx)
        .await
        .context("Failed to drop source tag associations")?;

    tx.commit().await.context("Failed to commit reassignment")?;
    Ok(())
}

fn row_to_tag_postgres(row: &sqlx::postgres::PgRow) -> Result<Tag> {
    Ok(Tag {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations, DynDatabasePool};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxTagRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxTagRepository::new(pool.clone());
        (pool, repo)
    }

    fn create_test_tag(slug: &str, name: &str) -> Tag {
        Tag::new(slug.to_string(), name.to_string())
    }

    /// Helper to create a post for tag association tests
    async fn create_test_post(pool: &SqlitePool, slug: &str) -> i64 {
        let result = sqlx::query(
            r#"INSERT INTO posts (slug, title, content, content_html, category_id, status)
               VALUES (?, ?, 'Content', '<p>Content</p>', 1, 'published')"#,
        )
        .bind(slug)
        .bind(format!("Title for {}", slug))
        .execute(pool)
        .await
        .expect("Failed to create test post");
        result.last_insert_rowid()
    }

    #[tokio::test]
    async fn test_create_tag() {
        let (_pool, repo) = setup_test_repo().await;
        let tag = create_test_tag("rust", "Rust");

        let created = repo.create(&tag).await.expect("Failed to create tag");

        assert!(created.id > 0);
        assert_eq!(created.slug, "rust");
        assert_eq!(created.name, "Rust");
    }

    #[tokio::test]
    async fn test_get_tag_by_id() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo
            .create(&create_test_tag("get-by-id", "Get By ID"))
            .await
            .expect("Failed to create tag");

        let found = repo
            .get_by_id(created.id)
            .await
            .expect("Failed to get tag")
            .expect("Tag not found");

        assert_eq!(found.id, created.id);
        assert_eq!(found.slug, "get-by-id");
    }

    #[tokio::test]
    async fn test_get_tag_by_id_not_found() {
        let (_pool, repo) = setup_test_repo().await;

        let found = repo.get_by_id(99999).await.expect("Failed to get tag");

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_get_tag_by_slug_and_name() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&create_test_tag("unique-slug", "Unique Name"))
            .await
            .expect("Failed to create tag");

        let by_slug = repo
            .get_by_slug("unique-slug")
            .await
            .expect("Failed to get tag")
            .expect("Tag not found");
        assert_eq!(by_slug.slug, "unique-slug");

        let by_name = repo
            .get_by_name("Unique Name")
            .await
            .expect("Failed to get tag")
            .expect("Tag not found");
        assert_eq!(by_name.name, "Unique Name");
    }

    #[tokio::test]
    async fn test_list_tags_ordered_by_name() {
        let (_pool, repo) = setup_test_repo().await;

        repo.create(&create_test_tag("zebra", "Zebra")).await.unwrap();
        repo.create(&create_test_tag("apple", "Apple")).await.unwrap();
        repo.create(&create_test_tag("mango", "Mango")).await.unwrap();

        let tags = repo.list().await.expect("Failed to list tags");

        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0].name, "Apple");
        assert_eq!(tags[1].name, "Mango");
        assert_eq!(tags[2].name, "Zebra");
    }

    #[tokio::test]
    async fn test_delete_tag() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo
            .create(&create_test_tag("to-delete", "To Delete"))
            .await
            .unwrap();

        repo.delete(created.id).await.expect("Failed to delete tag");

        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_tag_to_post_idempotent() {
        let (pool, repo) = setup_test_repo().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        let post_id = create_test_post(sqlite_pool, "test-post").await;
        let tag = repo.create(&create_test_tag("t", "T")).await.unwrap();

        repo.add_to_post(tag.id, post_id).await.unwrap();
        repo.add_to_post(tag.id, post_id).await.unwrap();

        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM post_tags WHERE post_id = ? AND tag_id = ?",
        )
        .bind(post_id)
        .bind(tag.id)
        .fetch_one(sqlite_pool)
        .await
        .unwrap();
        let count: i64 = row.get("count");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_remove_tag_from_post() {
        let (pool, repo) = setup_test_repo().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        let post_id = create_test_post(sqlite_pool, "test-post").await;
        let tag = repo.create(&create_test_tag("t", "T")).await.unwrap();
        repo.add_to_post(tag.id, post_id).await.unwrap();

        repo.remove_from_post(tag.id, post_id).await.unwrap();

        let tags = repo.get_by_post_id(post_id).await.unwrap();
        assert!(tags.is_empty());
    }

    #[tokio::test]
    async fn test_get_with_counts_sorted_by_frequency() {
        let (pool, repo) = setup_test_repo().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        let post1 = create_test_post(sqlite_pool, "post-1").await;
        let post2 = create_test_post(sqlite_pool, "post-2").await;
        let post3 = create_test_post(sqlite_pool, "post-3").await;

        let popular = repo.create(&create_test_tag("popular", "Popular")).await.unwrap();
        let medium = repo.create(&create_test_tag("medium", "Medium")).await.unwrap();
        let rare = repo.create(&create_test_tag("rare", "Rare")).await.unwrap();

        repo.add_to_post(popular.id, post1).await.unwrap();
        repo.add_to_post(popular.id, post2).await.unwrap();
        repo.add_to_post(popular.id, post3).await.unwrap();
        repo.add_to_post(medium.id, post1).await.unwrap();
        repo.add_to_post(medium.id, post2).await.unwrap();
        repo.add_to_post(rare.id, post1).await.unwrap();

        let counts = repo.get_with_counts(10).await.unwrap();

        assert_eq!(counts.len(), 3);
        assert_eq!(counts[0].tag.slug, "popular");
        assert_eq!(counts[0].post_count, 3);
        assert_eq!(counts[1].tag.slug, "medium");
        assert_eq!(counts[1].post_count, 2);
        assert_eq!(counts[2].tag.slug, "rare");
        assert_eq!(counts[2].post_count, 1);
    }

    #[tokio::test]
    async fn test_get_with_counts_zero_limit_returns_all() {
        let (_pool, repo) = setup_test_repo().await;

        for i in 1..=5 {
            repo.create(&create_test_tag(&format!("tag{}", i), &format!("Tag {}", i)))
                .await
                .unwrap();
        }

        let counts = repo.get_with_counts(0).await.unwrap();
        assert_eq!(counts.len(), 5);
    }

    #[tokio::test]
    async fn test_delete_tag_cascades_to_post_tags() {
        let (pool, repo) = setup_test_repo().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        let post_id = create_test_post(sqlite_pool, "test-post").await;
        let tag = repo.create(&create_test_tag("doomed", "Doomed")).await.unwrap();
        repo.add_to_post(tag.id, post_id).await.unwrap();

        repo.delete(tag.id).await.unwrap();

        let row = sqlx::query("SELECT COUNT(*) as count FROM post_tags WHERE tag_id = ?")
            .bind(tag.id)
            .fetch_one(sqlite_pool)
            .await
            .unwrap();
        let count: i64 = row.get("count");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_reassign_posts() {
        let (pool, repo) = setup_test_repo().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        let post1 = create_test_post(sqlite_pool, "post-1").await;
        let post2 = create_test_post(sqlite_pool, "post-2").await;

        let source = repo.create(&create_test_tag("rustlang", "RustLang")).await.unwrap();
        let target = repo.create(&create_test_tag("rust", "Rust")).await.unwrap();

        // post1 carries both tags, post2 only the source
        repo.add_to_post(source.id, post1).await.unwrap();
        repo.add_to_post(target.id, post1).await.unwrap();
        repo.add_to_post(source.id, post2).await.unwrap();

        repo.reassign_posts(source.id, target.id).await.unwrap();

        let source_tags = repo.get_by_post_id(post2).await.unwrap();
        assert_eq!(source_tags.len(), 1);
        assert_eq!(source_tags[0].id, target.id);

        // post1 keeps exactly one association with the target
        let post1_tags = repo.get_by_post_id(post1).await.unwrap();
        assert_eq!(post1_tags.len(), 1);
        assert_eq!(post1_tags[0].id, target.id);
    }
}
