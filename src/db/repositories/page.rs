//! Page repository
//!
//! Database operations for standalone pages.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Page, PageStatus};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, SqlitePool};
use std::sync::Arc;

/// Page repository trait
#[async_trait]
pub trait PageRepository: Send + Sync {
    /// Create a new page
    async fn create(&self, page: &Page) -> Result<Page>;

    /// Get page by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Page>>;

    /// Get page by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Page>>;

    /// List all pages ordered by title
    async fn list(&self) -> Result<Vec<Page>>;

    /// Persist mutable fields of a page
    async fn update(&self, page: &Page) -> Result<()>;

    /// Delete a page. Returns false when absent.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Check whether a slug is taken, optionally excluding one page
    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Count all pages
    async fn count_all(&self) -> Result<i64>;
}

/// SQLx-based page repository implementation
///
/// Supports both SQLite and PostgreSQL databases.
pub struct SqlxPageRepository {
    pool: DynDatabasePool,
}

impl SqlxPageRepository {
    /// Create a new SQLx page repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PageRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PageRepository for SqlxPageRepository {
    async fn create(&self, page: &Page) -> Result<Page> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), page).await,
            DatabaseDriver::Postgres => {
                create_postgres(self.pool.as_postgres().unwrap(), page).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Page>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Postgres => {
                get_by_id_postgres(self.pool.as_postgres().unwrap(), id).await
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Page>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Postgres => {
                get_by_slug_postgres(self.pool.as_postgres().unwrap(), slug).await
            }
        }
    }

    async fn list(&self) -> Result<Vec<Page>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Postgres => list_postgres(self.pool.as_postgres().unwrap()).await,
        }
    }

    async fn update(&self, page: &Page) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_sqlite(self.pool.as_sqlite().unwrap(), page).await,
            DatabaseDriver::Postgres => {
                update_postgres(self.pool.as_postgres().unwrap(), page).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Postgres => delete_postgres(self.pool.as_postgres().unwrap(), id).await,
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

const PAGE_COLUMNS: &str = "id, slug, title, content, content_html, status, created_at, updated_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, page: &Page) -> Result<Page> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO pages (slug, title, content, content_html, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&page.slug)
    .bind(&page.title)
    .bind(&page.content)
    .bind(&page.content_html)
    .bind(page.status.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create page")?;

    let mut created = page.clone();
    created.id = result.last_insert_rowid();
    created.created_at = now;
    created.updated_at = now;
    Ok(created)
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Page>> {
    let sql = format!("SELECT {} FROM pages WHERE id = ?", PAGE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get page by id")?;

    match row {
        Some(row) => Ok(Some(row_to_page_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn get_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Page>> {
    let sql = format!("SELECT {} FROM pages WHERE slug = ?", PAGE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get page by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_page_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_sqlite(pool: &SqlitePool) -> Result<Vec<Page>> {
    let sql = format!("SELECT {} FROM pages ORDER BY title", PAGE_COLUMNS);
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("Failed to list pages")?;

    let mut pages = Vec::new();
    for row in rows {
        pages.push(row_to_page_sqlite(&row)?);
    }
    Ok(pages)
}

async fn update_sqlite(pool: &SqlitePool, page: &Page) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE pages
        SET slug = ?, title = ?, content = ?, content_html = ?, status = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&page.slug)
    .bind(&page.title)
    .bind(&page.content)
    .bind(&page.content_html)
    .bind(page.status.as_str())
    .bind(page.updated_at)
    .bind(page.id)
    .execute(pool)
    .await
    .context("Failed to update page")?;
    Ok(())
}

async fn delete_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM pages WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete page")?;
    Ok(result.rows_affected() > 0)
}

async fn slug_exists_sqlite(
    pool: &SqlitePool,
    slug: &str,
    exclude_id: Option<i64>,
) -> Result<bool> {
    let row = match exclude_id {
        Some(id) => {
            sqlx::query("SELECT COUNT(*) as count FROM pages WHERE slug = ? AND id != ?")
                .bind(slug)
                .bind(id)
                .fetch_one(pool)
                .await
        }
        None => {
            sqlx::query("SELECT COUNT(*) as count FROM pages WHERE slug = ?")
                .bind(slug)
                .fetch_one(pool)
                .await
        }
    }
    .context("Failed to check page slug")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn count_all_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM pages")
        .fetch_one(pool)
        .await
        .context("Failed to count pages")?;
    Ok(row.get("count"))
}

fn row_to_page_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Page> {
    let status_str: String = row.get("status");
    let status = PageStatus::parse(&status_str)
        .ok_or_else(|| anyhow!("Invalid page status in database: {}", status_str))?;

    Ok(Page {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        status,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// PostgreSQL implementations
// ============================================================================

async fn create_postgres(pool: &PgPool, page: &Page) -> Result<Page> {
    let now = Utc::now();

    let row = sqlx::query(
        r#"
        INSERT INTO pages (slug, title, content, content_html, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(&page.slug)
    .bind(&page.title)
    .bind(&page.content)
    .bind(&page.content_html)
    .bind(page.status.as_str())
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
    .context("Failed to create page")?;

    let mut created = page.clone();
    created.id = row.get("id");
    created.created_at = now;
    created.updated_at = now;
    Ok(created)
}

async fn get_by_id_postgres(pool: &PgPool, id: i64) -> Result<Option<Page>> {
    let sql = format!("SELECT {} FROM pages WHERE id = $1", PAGE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get page by id")?;

    match row {
        Some(row) => Ok(Some(row_to_page_postgres(&row)?)),
        None => Ok(None),
    }
}

async fn get_by_slug_postgres(pool: &PgPool, slug: &str) -> Result<Option<Page>> {
    let sql = format!("SELECT {} FROM pages WHERE slug = $1", PAGE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get page by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_page_postgres(&row)?)),
        None => Ok(None),
    }
}

async fn list_postgres(pool: &PgPool) -> Result<Vec<Page>> {
    let sql = format!("SELECT {} FROM pages ORDER BY title", PAGE_COLUMNS);
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("Failed to list pages")?;

    let mut pages = Vec::new();
    for row in rows {
        pages.push(row_to_page_postgres(&row)?);
    }
    Ok(pages)
}

async fn update_postgres(pool: &PgPool, page: &Page) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE pages
        SET slug = $1, title = $2, content = $3, content_html = $4, status = $5, updated_at = $6
        WHERE id = $7
        "#,
    )
    .bind(&page.slug)
    .bind(&page.title)
    .bind(&page.content)
    .bind(&page.content_html)
    .bind(page.status.as_str())
    .bind(page.updated_at)
    .bind(page.id)
    .execute(pool)
    .await
    .context("Failed to update page")?;
    Ok(())
}

async fn delete_postgres(pool: &PgPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM pages WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete page")?;
    Ok(result.rows_affected() > 0)
}

async fn slug_exists_postgres(pool: &PgPool, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
    let row = match exclude_id {
        Some(id) => {
            sqlx::query("SELECT COUNT(*) as count FROM pages WHERE slug = $1 AND id != $2")
                .bind(slug)
                .bind(id)
                .fetch_one(pool)
                .await
        }
        None => {
            sqlx::query("SELECT COUNT(*) as count FROM pages WHERE slug = $1")
                .bind(slug)
                .fetch_one(pool)
                .await
        }
    }
    .context("Failed to check page slug")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn count_all_postgres(pool: &PgPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM pages")
        .fetch_one(pool)
        .await
        .context("Failed to count pages")?;
    Ok(row.get("count"))
}

fn row_to_page_postgres(row: &sqlx::postgres::PgRow) -> Result<Page> {
    let status_str: String = row.get("status");
    let status = PageStatus::parse(&status_str)
        .ok_or_else(|| anyhow!("Invalid page status in database: {}", status_str))?;

    Ok(Page {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        status,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxPageRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxPageRepository::new(pool)
    }

    fn sample_page(slug: &str) -> Page {
        Page::new(
            slug.to_string(),
            format!("Title for {}", slug),
            "About us".to_string(),
            "<p>About us</p>".to_string(),
        )
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = setup().await;

        let created = repo
            .create(&sample_page("about"))
            .await
            .expect("Failed to create page");
        assert!(created.id > 0);
        assert_eq!(created.status, PageStatus::Draft);

        let found = repo.get_by_slug("about").await.unwrap().unwrap();
        assert_eq!(found.title, "Title for about");
    }

    #[tokio::test]
    async fn test_update() {
        let repo = setup().await;
        let mut page = repo.create(&sample_page("contact")).await.unwrap();

        page.status = PageStatus::Published;
        page.title = "Contact Us".into();
        page.updated_at = Utc::now();
        repo.update(&page).await.unwrap();

        let reloaded = repo.get_by_id(page.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, PageStatus::Published);
        assert_eq!(reloaded.title, "Contact Us");
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = setup().await;
        let page = repo.create(&sample_page("doomed")).await.unwrap();

        assert!(repo.delete(page.id).await.unwrap());
        assert!(!repo.delete(page.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_slug_exists() {
        let repo = setup().await;
        let page = repo.create(&sample_page("taken")).await.unwrap();

        assert!(repo.slug_exists("taken", None).await.unwrap());
        assert!(!repo.slug_exists("taken", Some(page.id)).await.unwrap());
        assert!(!repo.slug_exists("free", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_ordered_by_title() {
        let repo = setup().await;

        let mut z = sample_page("z-page");
        z.title = "Zulu".into();
        let mut a = sample_page("a-page");
        a.title = "Alpha".into();
        repo.create(&z).await.unwrap();
        repo.create(&a).await.unwrap();

        let pages = repo.list().await.unwrap();
        assert_eq!(pages[0].title, "Alpha");
        assert_eq!(pages[1].title, "Zulu");
    }
}
