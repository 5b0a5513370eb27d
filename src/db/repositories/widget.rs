//! Widget repository
//!
//! Database operations for layout widgets. The `config` column holds the
//! kind-specific JSON blob as text; parsing failures surface as errors
//! rather than silently defaulting.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Widget, WidgetArea, WidgetKind, WidgetOrderItem};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Widget repository trait
#[async_trait]
pub trait WidgetRepository: Send + Sync {
    /// Create a new widget
    async fn create(&self, widget: &Widget) -> Result<Widget>;

    /// Get widget by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Widget>>;

    /// List all widgets ordered by area then sort_order
    async fn list(&self) -> Result<Vec<Widget>>;

    /// List widgets in one area ordered by sort_order
    async fn list_by_area(&self, area: WidgetArea) -> Result<Vec<Widget>>;

    /// Persist mutable fields of a widget
    async fn update(&self, widget: &Widget) -> Result<()>;

    /// Delete a widget. Returns false when absent.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Apply a batch of sort_order moves
    async fn reorder(&self, moves: &[WidgetOrderItem]) -> Result<()>;
}

/// SQLx-based widget repository implementation
///
/// Supports both SQLite and PostgreSQL databases.
pub struct SqlxWidgetRepository {
    pool: DynDatabasePool,
}

impl SqlxWidgetRepository {
    /// Create a new SQLx widget repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn WidgetRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl WidgetRepository for SqlxWidgetRepository {
    async fn create(&self, widget: &Widget) -> Result<Widget> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), widget).await,
            DatabaseDriver::Postgres => {
                create_postgres(self.pool.as_postgres().unwrap(), widget).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Widget>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Postgres => {
                get_by_id_postgres(self.pool.as_postgres().unwrap(), id).await
            }
        }
    }

    async fn list(&self) -> Result<Vec<Widget>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_sqlite(self.pool.as_sqlite().unwrap(), None).await,
            DatabaseDriver::Postgres => list_postgres(self.pool.as_postgres().unwrap(), None).await,
        }
    }

    async fn list_by_area(&self, area: WidgetArea) -> Result<Vec<Widget>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_sqlite(self.pool.as_sqlite().unwrap(), Some(area)).await,
            DatabaseDriver::Postgres => {
                list_postgres(self.pool.as_postgres().unwrap(), Some(area)).await
            }
        }
    }

    async fn update(&self, widget: &Widget) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_sqlite(self.pool.as_sqlite().unwrap(), widget).await,
            DatabaseDriver::Postgres => {
                update_postgres(self.pool.as_postgres().unwrap(), widget).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Postgres => delete_postgres(self.pool.as_postgres().unwrap(), id).await,
        }
    }

    async fn reorder(&self, moves: &[WidgetOrderItem]) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => reorder_sqlite(self.pool.as_sqlite().unwrap(), moves).await,
            DatabaseDriver::Postgres => {
                reorder_postgres(self.pool.as_postgres().unwrap(), moves).await
            }
        }
    }
}

const WIDGET_COLUMNS: &str = "id, area, kind, title, config, sort_order, visible, created_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, widget: &Widget) -> Result<Widget> {
    let config_json =
        serde_json::to_string(&widget.config).context("Failed to serialize widget config")?;

    let result = sqlx::query(
        r#"
        INSERT INTO widgets (area, kind, title, config, sort_order, visible, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(widget.area.to_string())
    .bind(widget.kind.to_string())
    .bind(&widget.title)
    .bind(&config_json)
    .bind(widget.sort_order)
    .bind(widget.visible)
    .bind(widget.created_at)
    .execute(pool)
    .await
    .context("Failed to create widget")?;

    let mut created = widget.clone();
    created.id = result.last_insert_rowid();
    Ok(created)
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Widget>> {
    let sql = format!("SELECT {} FROM widgets WHERE id = ?", WIDGET_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get widget")?;

    match row {
        Some(row) => Ok(Some(row_to_widget_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_sqlite(pool: &SqlitePool, area: Option<WidgetArea>) -> Result<Vec<Widget>> {
    let rows = match area {
        Some(area) => {
            let sql = format!(
                "SELECT {} FROM widgets WHERE area = ? ORDER BY sort_order, id",
                WIDGET_COLUMNS
            );
            sqlx::query(&sql)
                .bind(area.to_string())
                .fetch_all(pool)
                .await
        }
        None => {
            let sql = format!(
                "SELECT {} FROM widgets ORDER BY area, sort_order, id",
                WIDGET_COLUMNS
            );
            sqlx::query(&sql).fetch_all(pool).await
        }
    }
    .context("Failed to list widgets")?;

    let mut widgets = Vec::new();
    for row in rows {
        widgets.push(row_to_widget_sqlite(&row)?);
    }
    Ok(widgets)
}

async fn update_sqlite(pool: &SqlitePool, widget: &Widget) -> Result<()> {
    let config_json =
        serde_json::to_string(&widget.config).context("Failed to serialize widget config")?;

    sqlx::query(
        r#"
        UPDATE widgets
        SET area = ?, kind = ?, title = ?, config = ?, sort_order = ?, visible = ?
        WHERE id = ?
        "#,
    )
    .bind(widget.area.to_string())
    .bind(widget.kind.to_string())
    .bind(&widget.title)
    .bind(&config_json)
    .bind(widget.sort_order)
    .bind(widget.visible)
    .bind(widget.id)
    .execute(pool)
    .await
    .context("Failed to update widget")?;
    Ok(())
}

async fn delete_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM widgets WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete widget")?;
    Ok(result.rows_affected() > 0)
}

async fn reorder_sqlite(pool: &SqlitePool, moves: &[WidgetOrderItem]) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    for m in moves {
        sqlx::query("UPDATE widgets SET sort_order = ? WHERE id = ?")
            .bind(m.sort_order)
            .bind(m.id)
            .execute(&mut *tx)
            .await
            .context("Failed to reorder widget")?;
    }

    tx.commit().await.context("Failed to commit reorder")?;
    Ok(())
}

fn row_to_widget_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Widget> {
    let area_str: String = row.get("area");
    let kind_str: String = row.get("kind");
    let config_str: String = row.get("config");

    Ok(Widget {
        id: row.get("id"),
        area: WidgetArea::from_str(&area_str)
            .map_err(|_| anyhow!("Invalid widget area in database: {}", area_str))?,
        kind: WidgetKind::from_str(&kind_str)
            .map_err(|_| anyhow!("Invalid widget kind in database: {}", kind_str))?,
        title: row.get("title"),
        config: serde_json::from_str(&config_str).context("Invalid widget config JSON")?,
        sort_order: row.get("sort_order"),
        visible: row.get("visible"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// PostgreSQL implementations
// ============================================================================

async fn create_postgres(pool: &PgPool, widget: &Widget) -> Result<Widget> {
    let config_json =
        serde_json::to_string(&widget.config).context("Failed to serialize widget config")?;

    let row = sqlx::query(
        r#"
        INSERT INTO widgets (area, kind, title, config, sort_order, visible, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(widget.area.to_string())
    .bind(widget.kind.to_string())
    .bind(&widget.title)
    .bind(&config_json)
    .bind(widget.sort_order)
    .bind(widget.visible)
    .bind(widget.created_at)
    .fetch_one(pool)
    .await
    .context("Failed to create widget")?;

    let mut created = widget.clone();
    created.id = row.get("id");
    Ok(created)
}

async fn get_by_id_postgres(pool: &PgPool, id: i64) -> Result<Option<Widget>> {
    let sql = format!("SELECT {} FROM widgets WHERE id = $1", WIDGET_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get widget")?;

    match row {
        Some(row) => Ok(Some(row_to_widget_postgres(&row)?)),
        None => Ok(None),
    }
}

async fn list_postgres(pool: &PgPool, area: Option<WidgetArea>) -> Result<Vec<Widget>> {
    let rows = match area {
        Some(area) => {
            let sql = format!(
                "SELECT {} FROM widgets WHERE area = $1 ORDER BY sort_order, id",
                WIDGET_COLUMNS
            );
            sqlx::query(&sql)
                .bind(area.to_string())
                .fetch_all(pool)
                .await
        }
        None => {
            let sql = format!(
                "SELECT {} FROM widgets ORDER BY area, sort_order, id",
                WIDGET_COLUMNS
            );
            sqlx::query(&sql).fetch_all(pool).await
        }
    }
    .context("Failed to list widgets")?;

    let mut widgets = Vec::new();
    for row in rows {
        widgets.push(row_to_widget_postgres(&row)?);
    }
    Ok(widgets)
}

async fn update_postgres(pool: &PgPool, widget: &Widget) -> Result<()> {
    let config_json =
        serde_json::to_string(&widget.config).context("Failed to serialize widget config")?;

    sqlx::query(
        r#"
        UPDATE widgets
        SET area = $1, kind = $2, title = $3, config = $4, sort_order = $5, visible = $6
        WHERE id = $7
        "#,
    )
    .bind(widget.area.to_string())
    .bind(widget.kind.to_string())
    .bind(&widget.title)
    .bind(&config_json)
    .bind(widget.sort_order)
    .bind(widget.visible)
    .bind(widget.id)
    .execute(pool)
    .await
    .context("Failed to update widget")?;
    Ok(())
}

async fn delete_postgres(pool: &PgPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM widgets WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete widget")?;
    Ok(result.rows_affected() > 0)
}

async fn reorder_postgres(pool: &PgPool, moves: &[WidgetOrderItem]) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    for m in moves {
        sqlx::query("UPDATE widgets SET sort_order = $1 WHERE id = $2")
            .bind(m.sort_order)
            .bind(m.id)
            .execute(&mut *tx)
            .await
            .context("Failed to reorder widget")?;
    }

    tx.commit().await.context("Failed to commit reorder")?;
    Ok(())
}

fn row_to_widget_postgres(row: &sqlx::postgres::PgRow) -> Result<Widget> {
    let area_str: String = row.get("area");
    let kind_str: String = row.get("kind");
    let config_str: String = row.get("config");

    Ok(Widget {
        id: row.get("id"),
        area: WidgetArea::from_str(&area_str)
            .map_err(|_| anyhow!("Invalid widget area in database: {}", area_str))?,
        kind: WidgetKind::from_str(&kind_str)
            .map_err(|_| anyhow!("Invalid widget kind in database: {}", kind_str))?,
        title: row.get("title"),
        config: serde_json::from_str(&config_str).context("Invalid widget config JSON")?,
        sort_order: row.get("sort_order"),
        visible: row.get("visible"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxWidgetRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxWidgetRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = setup().await;

        let mut widget = Widget::new(
            WidgetArea::Sidebar,
            WidgetKind::RecentPosts,
            "Recent".into(),
        );
        widget.config = serde_json::json!({"count": 5});

        let created = repo.create(&widget).await.expect("Failed to create widget");
        assert!(created.id > 0);

        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.kind, WidgetKind::RecentPosts);
        assert_eq!(found.config["count"], 5);
    }

    #[tokio::test]
    async fn test_list_by_area() {
        let repo = setup().await;

        repo.create(&Widget::new(
            WidgetArea::Sidebar,
            WidgetKind::TagCloud,
            "Tags".into(),
        ))
        .await
        .unwrap();
        repo.create(&Widget::new(
            WidgetArea::Footer,
            WidgetKind::Html,
            "Footer note".into(),
        ))
        .await
        .unwrap();

        let sidebar = repo.list_by_area(WidgetArea::Sidebar).await.unwrap();
        assert_eq!(sidebar.len(), 1);
        assert_eq!(sidebar[0].kind, WidgetKind::TagCloud);

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_update() {
        let repo = setup().await;
        let mut widget = repo
            .create(&Widget::new(
                WidgetArea::Sidebar,
                WidgetKind::Html,
                "Old".into(),
            ))
            .await
            .unwrap();

        widget.title = "New".into();
        widget.config = serde_json::json!({"html": "<b>hi</b>"});
        widget.visible = false;
        repo.update(&widget).await.unwrap();

        let reloaded = repo.get_by_id(widget.id).await.unwrap().unwrap();
        assert_eq!(reloaded.title, "New");
        assert_eq!(reloaded.config["html"], "<b>hi</b>");
        assert!(!reloaded.visible);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = setup().await;
        let widget = repo
            .create(&Widget::new(
                WidgetArea::Sidebar,
                WidgetKind::CategoryList,
                "Cats".into(),
            ))
            .await
            .unwrap();

        assert!(repo.delete(widget.id).await.unwrap());
        assert!(!repo.delete(widget.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_reorder() {
        let repo = setup().await;

        let a = repo
            .create(&Widget::new(WidgetArea::Sidebar, WidgetKind::Html, "A".into()))
            .await
            .unwrap();
        let b = repo
            .create(&Widget::new(WidgetArea::Sidebar, WidgetKind::Html, "B".into()))
            .await
            .unwrap();

        repo.reorder(&[
            WidgetOrderItem {
                id: a.id,
                sort_order: 2,
            },
            WidgetOrderItem {
                id: b.id,
                sort_order: 1,
            },
        ])
        .await
        .unwrap();

        let widgets = repo.list_by_area(WidgetArea::Sidebar).await.unwrap();
        assert_eq!(widgets[0].title, "B");
        assert_eq!(widgets[1].title, "A");
    }
}
