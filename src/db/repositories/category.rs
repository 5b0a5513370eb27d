//! Category repository
//!
//! Database operations for categories, including the post reassignment
//! and child detachment that category deletion needs.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Category;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, category: &Category) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Get category by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// List all categories ordered by sort_order, then name
    async fn list(&self) -> Result<Vec<Category>>;

    /// List all categories with their post counts
    async fn list_with_counts(&self) -> Result<Vec<(Category, i64)>>;

    /// Persist mutable fields of a category
    async fn update(&self, category: &Category) -> Result<()>;

    /// Delete a category row
    async fn delete(&self, id: i64) -> Result<()>;

    /// Move all posts of one category to another
    async fn reassign_posts(&self, from_id: i64, to_id: i64) -> Result<u64>;

    /// Detach children of a category to the root level
    async fn detach_children(&self, id: i64) -> Result<()>;

    /// Check whether a slug is taken, optionally excluding one category
    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Count all categories
    async fn count_all(&self) -> Result<i64>;
}

/// SQLx-based category repository implementation
///
/// Supports both SQLite and PostgreSQL databases.
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    /// Create a new SQLx category repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), category).await,
            DatabaseDriver::Postgres => {
                create_postgres(self.pool.as_postgres().unwrap(), category).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Postgres => {
                get_by_id_postgres(self.pool.as_postgres().unwrap(), id).await
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Postgres => {
                get_by_slug_postgres(self.pool.as_postgres().unwrap(), slug).await
            }
        }
    }

    async fn list(&self) -> Result<Vec<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Postgres => list_postgres(self.pool.as_postgres().unwrap()).await,
        }
    }

    async fn list_with_counts(&self) -> Result<Vec<(Category, i64)>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_with_counts_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Postgres => {
                list_with_counts_postgres(self.pool.as_postgres().unwrap()).await
            }
        }
    }

    async fn update(&self, category: &Category) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_sqlite(self.pool.as_sqlite().unwrap(), category).await,
            DatabaseDriver::Postgres => {
                update_postgres(self.pool.as_postgres().unwrap(), category).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Postgres => delete_postgres(self.pool.as_postgres().unwrap(), id).await,
        }
    }

    async fn reassign_posts(&self, from_id: i64, to_id: i64) -> Result<u64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                reassign_posts_sqlite(self.pool.as_sqlite().unwrap(), from_id, to_id).await
            }
            DatabaseDriver::Postgres => {
                reassign_posts_postgres(self.pool.as_postgres().unwrap(), from_id, to_id).await
            }
        }
    }

    async fn detach_children(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                detach_children_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Postgres => {
                detach_children_postgres(self.pool.as_postgres().unwrap(), id).await
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

    async fn count_all(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_all_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Postgres => count_all_postgres(self.pool.as_postgres().unwrap()).await,
        }
    }
}

const CATEGORY_COLUMNS: &str = "id, slug, name, description, parent_id, sort_order, created_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, category: &Category) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO categories (slug, name, description, parent_id, sort_order, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&category.slug)
    .bind(&category.name)
    .bind(&category.description)
    .bind(category.parent_id)
    .bind(category.sort_order)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    let mut created = category.clone();
    created.id = result.last_insert_rowid();
    created.created_at = now;
    Ok(created)
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Category>> {
    let sql = format!("SELECT {} FROM categories WHERE id = ?", CATEGORY_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by id")?;

    match row {
        Some(row) => Ok(Some(row_to_category_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn get_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Category>> {
    let sql = format!("SELECT {} FROM categories WHERE slug = ?", CATEGORY_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_category_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_sqlite(pool: &SqlitePool) -> Result<Vec<Category>> {
    let sql = format!(
        "SELECT {} FROM categories ORDER BY sort_order, name",
        CATEGORY_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    let mut categories = Vec::new();
    for row in rows {
        categories.push(row_to_category_sqlite(&row)?);
    }
    Ok(categories)
}

async fn list_with_counts_sqlite(pool: &SqlitePool) -> Result<Vec<(Category, i64)>> {
    let rows = sqlx::query(
        r#"
        SELECT c.id, c.slug, c.name, c.description, c.parent_id, c.sort_order, c.created_at,
               COUNT(p.id) as post_count
        FROM categories c
        LEFT JOIN posts p ON p.category_id = c.id
        GROUP BY c.id, c.slug, c.name, c.description, c.parent_id, c.sort_order, c.created_at
        ORDER BY c.sort_order, c.name
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list categories with counts")?;

    let mut categories = Vec::new();
    for row in rows {
        let category = row_to_category_sqlite(&row)?;
        let post_count: i64 = row.get("post_count");
        categories.push((category, post_count));
    }
    Ok(categories)
}

async fn update_sqlite(pool: &SqlitePool, category: &Category) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE categories
        SET slug = ?, name = ?, description = ?, parent_id = ?, sort_order = ?
        WHERE id = ?
        "#,
    )
    .bind(&category.slug)
    .bind(&category.name)
    .bind(&category.description)
    .bind(category.parent_id)
    .bind(category.sort_order)
    .bind(category.id)
    .execute(pool)
    .await
    .context("Failed to update category")?;
    Ok(())
}

async fn delete_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;
    Ok(())
}

async fn reassign_posts_sqlite(pool: &SqlitePool, from_id: i64, to_id: i64) -> Result<u64> {
    let result = sqlx::query("UPDATE posts SET category_id = ? WHERE category_id = ?")
        .bind(to_id)
        .bind(from_id)
        .execute(pool)
        .await
        .context("Failed to reassign posts")?;
    Ok(result.rows_affected())
}

async fn detach_children_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("UPDATE categories SET parent_id = NULL WHERE parent_id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to detach child categories")?;
    Ok(())
}

async fn slug_exists_sqlite(
    pool: &SqlitePool,
    slug: &str,
    exclude_id: Option<i64>,
) -> Result<bool> {
    let row = match exclude_id {
        Some(id) => {
            sqlx::query("SELECT COUNT(*) as count FROM categories WHERE slug = ? AND id != ?")
                .bind(slug)
                .bind(id)
                .fetch_one(pool)
                .await
        }
        None => {
            sqlx::query("SELECT COUNT(*) as count FROM categories WHERE slug = ?")
                .bind(slug)
                .fetch_one(pool)
                .await
        }
    }
    .context("Failed to check category slug")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn count_all_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM categories")
        .fetch_one(pool)
        .await
        .context("Failed to count categories")?;
    Ok(row.get("count"))
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Category> {
    Ok(Category {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        description: row.get("description"),
        parent_id: row.get("parent_id"),
        sort_order: row.get("sort_order"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// PostgreSQL implementations
// ============================================================================

async fn create_postgres(pool: &PgPool, category: &Category) -> Result<Category> {
    let now = Utc::now();

    let row = sqlx::query(
        r#"
        INSERT INTO categories (slug, name, description, parent_id, sort_order, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(&category.slug)
    .bind(&category.name)
    .bind(&category.description)
    .bind(category.parent_id)
    .bind(category.sort_order)
    .bind(now)
    .fetch_one(pool)
    .await
    .context("Failed to create category")?;

    let mut created = category.clone();
    created.id = row.get("id");
    created.created_at = now;
    Ok(created)
}

async fn get_by_id_postgres(pool: &PgPool, id: i64) -> Result<Option<Category>> {
    let sql = format!("SELECT {} FROM categories WHERE id = $1", CATEGORY_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by id")?;

    match row {
        Some(row) => Ok(Some(row_to_category_postgres(&row)?)),
        None => Ok(None),
    }
}

async fn get_by_slug_postgres(pool: &PgPool, slug: &str) -> Result<Option<Category>> {
    let sql = format!(
        "SELECT {} FROM categories WHERE slug = $1",
        CATEGORY_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_category_postgres(&row)?)),
        None => Ok(None),
    }
}

async fn list_postgres(pool: &PgPool) -> Result<Vec<Category>> {
    let sql = format!(
        "SELECT {} FROM categories ORDER BY sort_order, name",
        CATEGORY_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    let mut categories = Vec::new();
    for row in rows {
        categories.push(row_to_category_postgres(&row)?);
    }
    Ok(categories)
}

async fn list_with_counts_postgres(pool: &PgPool) -> Result<Vec<(Category, i64)>> {
    let rows = sqlx::query(
        r#"
        SELECT c.id, c.slug, c.name, c.description, c.parent_id, c.sort_order, c.created_at,
               COUNT(p.id) as post_count
        FROM categories c
        LEFT JOIN posts p ON p.category_id = c.id
        GROUP BY c.id, c.slug, c.name, c.description, c.parent_id, c.sort_order, c.created_at
        ORDER BY c.sort_order, c.name
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list categories with counts")?;

    let mut categories = Vec::new();
    for row in rows {
        let category = row_to_category_postgres(&row)?;
        let post_count: i64 = row.get("post_count");
        categories.push((category, post_count));
    }
    Ok(categories)
}

async fn update_postgres(pool: &PgPool, category: &Category) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE categories
        SET slug = $1, name = $2, description = $3, parent_id = $4, sort_order = $5
        WHERE id = $6
        "#,
    )
    .bind(&category.slug)
    .bind(&category.name)
    .bind(&category.description)
    .bind(category.parent_id)
    .bind(category.sort_order)
    .bind(category.id)
    .execute(pool)
    .await
    .context("Failed to update category")?;
    Ok(())
}

async fn delete_postgres(pool: &PgPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;
    Ok(())
}

async fn reassign_posts_postgres(pool: &PgPool, from_id: i64, to_id: i64) -> Result<u64> {
    let result = sqlx::query("UPDATE posts SET category_id = $1 WHERE category_id = $2")
        .bind(to_id)
        .bind(from_id)
        .execute(pool)
        .await
        .context("Failed to reassign posts")?;
    Ok(result.rows_affected())
}

async fn detach_children_postgres(pool: &PgPool, id: i64) -> Result<()> {
    sqlx::query("UPDATE categories SET parent_id = NULL WHERE parent_id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to detach child categories")?;
    Ok(())
}

async fn slug_exists_postgres(pool: &PgPool, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
    let row = match exclude_id {
        Some(id) => {
            sqlx::query("SELECT COUNT(*) as count FROM categories WHERE slug = $1 AND id != $2")
                .bind(slug)
                .bind(id)
                .fetch_one(pool)
                .await
        }
        None => {
            sqlx::query("SELECT COUNT(*) as count FROM categories WHERE slug = $1")
                .bind(slug)
                .fetch_one(pool)
                .await
        }
    }
    .context("Failed to check category slug")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn count_all_postgres(pool: &PgPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM categories")
        .fetch_one(pool)
        .await
        .context("Failed to count categories")?;
    Ok(row.get("count"))
}

fn row_to_category_postgres(row: &sqlx::postgres::PgRow) -> Result<Category> {
    Ok(Category {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        description: row.get("description"),
        parent_id: row.get("parent_id"),
        sort_order: row.get("sort_order"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::DEFAULT_CATEGORY_ID;

    async fn setup_test_repo() -> (DynDatabasePool, SqlxCategoryRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxCategoryRepository::new(pool.clone());
        (pool, repo)
    }

    #[tokio::test]
    async fn test_default_category_exists() {
        let (_pool, repo) = setup_test_repo().await;

        let default = repo
            .get_by_id(DEFAULT_CATEGORY_ID)
            .await
            .unwrap()
            .expect("Default category should be seeded");
        assert_eq!(default.slug, "uncategorized");
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (_pool, repo) = setup_test_repo().await;

        let created = repo
            .create(&Category::new("tech".into(), "Technology".into()))
            .await
            .expect("Failed to create category");

        assert!(created.id > DEFAULT_CATEGORY_ID);

        let by_slug = repo.get_by_slug("tech").await.unwrap().unwrap();
        assert_eq!(by_slug.name, "Technology");
    }

    #[tokio::test]
    async fn test_list_ordering() {
        let (_pool, repo) = setup_test_repo().await;

        let mut b = Category::new("b".into(), "B".into());
        b.sort_order = 2;
        let mut a = Category::new("a".into(), "A".into());
        a.sort_order = 1;
        repo.create(&b).await.unwrap();
        repo.create(&a).await.unwrap();

        let all = repo.list().await.unwrap();
        // Default category has sort_order 0 and comes first
        assert_eq!(all[0].slug, "uncategorized");
        assert_eq!(all[1].slug, "a");
        assert_eq!(all[2].slug, "b");
    }

    #[tokio::test]
    async fn test_update() {
        let (_pool, repo) = setup_test_repo().await;
        let mut category = repo
            .create(&Category::new("old".into(), "Old".into()))
            .await
            .unwrap();

        category.name = "New".into();
        category.description = Some("desc".into());
        repo.update(&category).await.unwrap();

        let reloaded = repo.get_by_id(category.id).await.unwrap().unwrap();
        assert_eq!(reloaded.name, "New");
        assert_eq!(reloaded.description.as_deref(), Some("desc"));
    }

    #[tokio::test]
    async fn test_reassign_posts() {
        let (pool, repo) = setup_test_repo().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        let doomed = repo
            .create(&Category::new("doomed".into(), "Doomed".into()))
            .await
            .unwrap();

        sqlx::query(
            "INSERT INTO posts (slug, title, content, content_html, category_id) \
             VALUES ('p1', 'P1', '', '', ?)",
        )
        .bind(doomed.id)
        .execute(sqlite_pool)
        .await
        .unwrap();

        let moved = repo
            .reassign_posts(doomed.id, DEFAULT_CATEGORY_ID)
            .await
            .unwrap();
        assert_eq!(moved, 1);

        let row = sqlx::query("SELECT category_id FROM posts WHERE slug = 'p1'")
            .fetch_one(sqlite_pool)
            .await
            .unwrap();
        let category_id: i64 = row.get("category_id");
        assert_eq!(category_id, DEFAULT_CATEGORY_ID);
    }

    #[tokio::test]
    async fn test_detach_children() {
        let (_pool, repo) = setup_test_repo().await;

        let parent = repo
            .create(&Category::new("parent".into(), "Parent".into()))
            .await
            .unwrap();
        let mut child = Category::new("child".into(), "Child".into());
        child.parent_id = Some(parent.id);
        let child = repo.create(&child).await.unwrap();

        repo.detach_children(parent.id).await.unwrap();

        let reloaded = repo.get_by_id(child.id).await.unwrap().unwrap();
        assert!(reloaded.parent_id.is_none());
    }

    #[tokio::test]
    async fn test_slug_exists() {
        let (_pool, repo) = setup_test_repo().await;

        assert!(repo.slug_exists("uncategorized", None).await.unwrap());
        assert!(!repo.slug_exists("free", None).await.unwrap());
        assert!(!repo
            .slug_exists("uncategorized", Some(DEFAULT_CATEGORY_ID))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_list_with_counts() {
        let (pool, repo) = setup_test_repo().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        sqlx::query(
            "INSERT INTO posts (slug, title, content, content_html, category_id) \
             VALUES ('p1', 'P1', '', '', 1)",
        )
        .execute(sqlite_pool)
        .await
        .unwrap();

        let counts = repo.list_with_counts().await.unwrap();
        let (default, count) = counts
            .iter()
            .find(|(c, _)| c.id == DEFAULT_CATEGORY_ID)
            .unwrap();
        assert_eq!(default.slug, "uncategorized");
        assert_eq!(*count, 1);
    }
}
