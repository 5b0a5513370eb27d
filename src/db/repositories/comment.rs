//! Comment repository
//!
//! Database operations for comments, including the denormalized
//! comment counter kept on the owning post.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Comment;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, SqlitePool};
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a new comment
    async fn create(&self, comment: &Comment) -> Result<Comment>;

    /// Get comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Get all comments for a post, oldest first
    async fn get_by_post_id(&self, post_id: i64) -> Result<Vec<Comment>>;

    /// List all comments, newest first (admin overview)
    async fn list_recent(&self, limit: i64) -> Result<Vec<Comment>>;

    /// Delete a comment (replies cascade). Returns false when absent.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Recompute the denormalized comment_count on a post
    async fn refresh_post_comment_count(&self, post_id: i64) -> Result<()>;

    /// Count all comments
    async fn count_all(&self) -> Result<i64>;
}

/// SQLx-based comment repository implementation
///
/// Supports both SQLite and PostgreSQL databases.
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    /// Create a new SQLx comment repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<Comment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), comment).await,
            DatabaseDriver::Postgres => {
                create_postgres(self.pool.as_postgres().unwrap(), comment).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Postgres => {
                get_by_id_postgres(self.pool.as_postgres().unwrap(), id).await
            }
        }
    }

    async fn get_by_post_id(&self, post_id: i64) -> Result<Vec<Comment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_by_post_sqlite(self.pool.as_sqlite().unwrap(), post_id).await
            }
            DatabaseDriver::Postgres => {
                get_by_post_postgres(self.pool.as_postgres().unwrap(), post_id).await
            }
        }
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Comment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_recent_sqlite(self.pool.as_sqlite().unwrap(), limit).await,
            DatabaseDriver::Postgres => {
                list_recent_postgres(self.pool.as_postgres().unwrap(), limit).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Postgres => delete_postgres(self.pool.as_postgres().unwrap(), id).await,
        }
    }

    async fn refresh_post_comment_count(&self, post_id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                refresh_count_sqlite(self.pool.as_sqlite().unwrap(), post_id).await
            }
            DatabaseDriver::Postgres => {
                refresh_count_postgres(self.pool.as_postgres().unwrap(), post_id).await
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

const COMMENT_COLUMNS: &str = "id, post_id, parent_id, author_name, author_email, avatar_hash, \
     content, ip_address, user_agent, created_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, comment: &Comment) -> Result<Comment> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO comments (post_id, parent_id, author_name, author_email, avatar_hash,
                              content, ip_address, user_agent, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(comment.post_id)
    .bind(comment.parent_id)
    .bind(&comment.author_name)
    .bind(&comment.author_email)
    .bind(&comment.avatar_hash)
    .bind(&comment.content)
    .bind(&comment.ip_address)
    .bind(&comment.user_agent)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    let mut created = comment.clone();
    created.id = result.last_insert_rowid();
    created.created_at = now;
    Ok(created)
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Comment>> {
    let sql = format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment by id")?;

    match row {
        Some(row) => Ok(Some(row_to_comment_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn get_by_post_sqlite(pool: &SqlitePool, post_id: i64) -> Result<Vec<Comment>> {
    let sql = format!(
        "SELECT {} FROM comments WHERE post_id = ? ORDER BY created_at ASC, id ASC",
        COMMENT_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(post_id)
        .fetch_all(pool)
        .await
        .context("Failed to get comments by post")?;

    let mut comments = Vec::new();
    for row in rows {
        comments.push(row_to_comment_sqlite(&row)?);
    }
    Ok(comments)
}

async fn list_recent_sqlite(pool: &SqlitePool, limit: i64) -> Result<Vec<Comment>> {
    let sql = format!(
        "SELECT {} FROM comments ORDER BY created_at DESC, id DESC LIMIT ?",
        COMMENT_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list recent comments")?;

    let mut comments = Vec::new();
    for row in rows {
        comments.push(row_to_comment_sqlite(&row)?);
    }
    Ok(comments)
}

async fn delete_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete comment")?;
    Ok(result.rows_affected() > 0)
}

async fn refresh_count_sqlite(pool: &SqlitePool, post_id: i64) -> Result<()> {
    sqlx::query(
        "UPDATE posts SET comment_count = \
         (SELECT COUNT(*) FROM comments WHERE post_id = ?) WHERE id = ?",
    )
    .bind(post_id)
    .bind(post_id)
    .execute(pool)
    .await
    .context("Failed to refresh comment count")?;
    Ok(())
}

async fn count_all_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM comments")
        .fetch_one(pool)
        .await
        .context("Failed to count comments")?;
    Ok(row.get("count"))
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Comment> {
    Ok(Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        parent_id: row.get("parent_id"),
        author_name: row.get("author_name"),
        author_email: row.get("author_email"),
        avatar_hash: row.get("avatar_hash"),
        content: row.get("content"),
        ip_address: row.get("ip_address"),
        user_agent: row.get("user_agent"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// PostgreSQL implementations
// ============================================================================

async fn create_postgres(pool: &PgPool, comment: &Comment) -> Result<Comment> {
    let now = Utc::now();

    let row = sqlx::query(
        r#"
        INSERT INTO comments (post_id, parent_id, author_name, author_email, avatar_hash,
                              content, ip_address, user_agent, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id
        "#,
    )
    .bind(comment.post_id)
    .bind(comment.parent_id)
    .bind(&comment.author_name)
    .bind(&comment.author_email)
    .bind(&comment.avatar_hash)
    .bind(&comment.content)
    .bind(&comment.ip_address)
    .bind(&comment.user_agent)
    .bind(now)
    .fetch_one(pool)
    .await
    .context("Failed to create comment")?;

    let mut created = comment.clone();
    created.id = row.get("id");
    created.created_at = now;
    Ok(created)
}

async fn get_by_id_postgres(pool: &PgPool, id: i64) -> Result<Option<Comment>> {
    let sql = format!("SELECT {} FROM comments WHERE id = $1", COMMENT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment by id")?;

    match row {
        Some(row) => Ok(Some(row_to_comment_postgres(&row)?)),
        None => Ok(None),
    }
}

async fn get_by_post_postgres(pool: &PgPool, post_id: i64) -> Result<Vec<Comment>> {
    let sql = format!(
        "SELECT {} FROM comments WHERE post_id = $1 ORDER BY created_at ASC, id ASC",
        COMMENT_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(post_id)
        .fetch_all(pool)
        .await
        .context("Failed to get comments by post")?;

    let mut comments = Vec::new();
    for row in rows {
        comments.push(row_to_comment_postgres(&row)?);
    }
    Ok(comments)
}

async fn list_recent_postgres(pool: &PgPool, limit: i64) -> Result<Vec<Comment>> {
    let sql = format!(
        "SELECT {} FROM comments ORDER BY created_at DESC, id DESC LIMIT $1",
        COMMENT_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list recent comments")?;

    let mut comments = Vec::new();
    for row in rows {
        comments.push(row_to_comment_postgres(&row)?);
    }
    Ok(comments)
}

async fn delete_postgres(pool: &PgPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete comment")?;
    Ok(result.rows_affected() > 0)
}

async fn refresh_count_postgres(pool: &PgPool, post_id: i64) -> Result<()> {
    sqlx::query(
        "UPDATE posts SET comment_count = \
         (SELECT COUNT(*) FROM comments WHERE post_id = $1) WHERE id = $1",
    )
    .bind(post_id)
    .execute(pool)
    .await
    .context("Failed to refresh comment count")?;
    Ok(())
}

async fn count_all_postgres(pool: &PgPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM comments")
        .fetch_one(pool)
        .await
        .context("Failed to count comments")?;
    Ok(row.get("count"))
}

fn row_to_comment_postgres(row: &sqlx::postgres::PgRow) -> Result<Comment> {
    Ok(Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        parent_id: row.get("parent_id"),
        author_name: row.get("author_name"),
        author_email: row.get("author_email"),
        avatar_hash: row.get("avatar_hash"),
        content: row.get("content"),
        ip_address: row.get("ip_address"),
        user_agent: row.get("user_agent"),
        created_at: row.get("created_at"),
    })
}
