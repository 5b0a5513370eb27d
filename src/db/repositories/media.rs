//! Media repository
//!
//! Database operations for the upload library.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ListParams, MediaItem, PagedResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row, SqlitePool};
use std::sync::Arc;

/// Media repository trait
#[async_trait]
pub trait MediaRepository: Send + Sync {
    /// Record an uploaded file
    async fn create(&self, item: &MediaItem) -> Result<MediaItem>;

    /// Get a media item by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<MediaItem>>;

    /// List media items, newest first
    async fn list(&self, params: &ListParams) -> Result<PagedResult<MediaItem>>;

    /// Delete a media item row. Returns false when absent.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Count all media items
    async fn count_all(&self) -> Result<i64>;
}

/// SQLx-based media repository implementation
///
/// Supports both SQLite and PostgreSQL databases.
pub struct SqlxMediaRepository {
    pool: DynDatabasePool,
}

impl SqlxMediaRepository {
    /// Create a new SQLx media repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn MediaRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl MediaRepository for SqlxMediaRepository {
    async fn create(&self, item: &MediaItem) -> Result<MediaItem> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), item).await,
            DatabaseDriver::Postgres => {
                create_postgres(self.pool.as_postgres().unwrap(), item).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<MediaItem>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Postgres => {
                get_by_id_postgres(self.pool.as_postgres().unwrap(), id).await
            }
        }
    }

    async fn list(&self, params: &ListParams) -> Result<PagedResult<MediaItem>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_sqlite(self.pool.as_sqlite().unwrap(), params).await,
            DatabaseDriver::Postgres => {
                list_postgres(self.pool.as_postgres().unwrap(), params).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Postgres => delete_postgres(self.pool.as_postgres().unwrap(), id).await,
        }
    }

    async fn count_all(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_all_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Postgres => count_all_postgres(self.pool.as_postgres().unwrap()).await,
        }
    }
}

const MEDIA_COLUMNS: &str = "id, filename, original_name, mime_type, size_bytes, url, created_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, item: &MediaItem) -> Result<MediaItem> {
    let result = sqlx::query(
        r#"
        INSERT INTO media (filename, original_name, mime_type, size_bytes, url, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&item.filename)
    .bind(&item.original_name)
    .bind(&item.mime_type)
    .bind(item.size_bytes)
    .bind(&item.url)
    .bind(item.created_at)
    .execute(pool)
    .await
    .context("Failed to create media item")?;

    let mut created = item.clone();
    created.id = result.last_insert_rowid();
    Ok(created)
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<MediaItem>> {
    let sql = format!("SELECT {} FROM media WHERE id = ?", MEDIA_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get media item")?;

    match row {
        Some(row) => Ok(Some(row_to_media_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_sqlite(pool: &SqlitePool, params: &ListParams) -> Result<PagedResult<MediaItem>> {
    let count_row = sqlx::query("SELECT COUNT(*) as count FROM media")
        .fetch_one(pool)
        .await
        .context("Failed to count media items")?;
    let total: i64 = count_row.get("count");

    let sql = format!(
        "SELECT {} FROM media ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        MEDIA_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list media items")?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row_to_media_sqlite(&row)?);
    }

    Ok(PagedResult::new(items, total, params))
}

async fn delete_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM media WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete media item")?;
    Ok(result.rows_affected() > 0)
}

async fn count_all_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM media")
        .fetch_one(pool)
        .await
        .context("Failed to count media items")?;
    Ok(row.get("count"))
}

fn row_to_media_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<MediaItem> {
    Ok(MediaItem {
        id: row.get("id"),
        filename: row.get("filename"),
        original_name: row.get("original_name"),
        mime_type: row.get("mime_type"),
        size_bytes: row.get("size_bytes"),
        url: row.get("url"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// PostgreSQL implementations
// ============================================================================

async fn create_postgres(pool: &PgPool, item: &MediaItem) -> Result<MediaItem> {
    let row = sqlx::query(
        r#"
        INSERT INTO media (filename, original_name, mime_type, size_bytes, url, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(&item.filename)
    .bind(&item.original_name)
    .bind(&item.mime_type)
    .bind(item.size_bytes)
    .bind(&item.url)
    .bind(item.created_at)
    .fetch_one(pool)
    .await
    .context("Failed to create media item")?;

    let mut created = item.clone();
    created.id = row.get("id");
    Ok(created)
}

async fn get_by_id_postgres(pool: &PgPool, id: i64) -> Result<Option<MediaItem>> {
    let sql = format!("SELECT {} FROM media WHERE id = $1", MEDIA_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get media item")?;

    match row {
        Some(row) => Ok(Some(row_to_media_postgres(&row)?)),
        None => Ok(None),
    }
}

async fn list_postgres(pool: &PgPool, params: &ListParams) -> Result<PagedResult<MediaItem>> {
    let count_row = sqlx::query("SELECT COUNT(*) as count FROM media")
        .fetch_one(pool)
        .await
        .context("Failed to count media items")?;
    let total: i64 = count_row.get("count");

    let sql = format!(
        "SELECT {} FROM media ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
        MEDIA_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list media items")?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row_to_media_postgres(&row)?);
    }

    Ok(PagedResult::new(items, total, params))
}

async fn delete_postgres(pool: &PgPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM media WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete media item")?;
    Ok(result.rows_affected() > 0)
}

async fn count_all_postgres(pool: &PgPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM media")
        .fetch_one(pool)
        .await
        .context("Failed to count media items")?;
    Ok(row.get("count"))
}

fn row_to_media_postgres(row: &sqlx::postgres::PgRow) -> Result<MediaItem> {
    Ok(MediaItem {
        id: row.get("id"),
        filename: row.get("filename"),
        original_name: row.get("original_name"),
        mime_type: row.get("mime_type"),
        size_bytes: row.get("size_bytes"),
        url: row.get("url"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxMediaRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxMediaRepository::new(pool)
    }

    fn sample_item(filename: &str) -> MediaItem {
        MediaItem::new(
            filename.to_string(),
            "photo.png".to_string(),
            "image/png".to_string(),
            1234,
            format!("/uploads/{}", filename),
        )
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = setup().await;

        let created = repo
            .create(&sample_item("abc.png"))
            .await
            .expect("Failed to create media item");
        assert!(created.id > 0);

        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.filename, "abc.png");
        assert_eq!(found.mime_type, "image/png");
        assert_eq!(found.size_bytes, 1234);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let repo = setup().await;

        let first = repo.create(&sample_item("first.png")).await.unwrap();
        let second = repo.create(&sample_item("second.png")).await.unwrap();

        let page = repo.list(&ListParams::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].id, second.id);
        assert_eq!(page.items[1].id, first.id);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = setup().await;
        let item = repo.create(&sample_item("doomed.png")).await.unwrap();

        assert!(repo.delete(item.id).await.unwrap());
        assert!(!repo.delete(item.id).await.unwrap());
        assert!(repo.get_by_id(item.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_count_all() {
        let repo = setup().await;
        repo.create(&sample_item("one.png")).await.unwrap();
        assert_eq!(repo.count_all().await.unwrap(), 1);
    }
}
