//! Menu repository
//!
//! Database operations for navigation menu items.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{MenuItem, MenuItemType, MenuOrderItem};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Menu repository trait
#[async_trait]
pub trait MenuRepository: Send + Sync {
    /// Create a new menu item
    async fn create(&self, item: &MenuItem) -> Result<MenuItem>;

    /// Get menu item by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<MenuItem>>;

    /// List all menu items ordered by sort_order
    async fn list(&self) -> Result<Vec<MenuItem>>;

    /// Persist mutable fields of a menu item
    async fn update(&self, item: &MenuItem) -> Result<()>;

    /// Delete a menu item (children cascade). Returns false when absent.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Apply a batch of (parent_id, sort_order) moves
    async fn reorder(&self, moves: &[MenuOrderItem]) -> Result<()>;

    /// Count all menu items
    async fn count_all(&self) -> Result<i64>;
}

/// SQLx-based menu repository implementation
///
/// Supports both SQLite and PostgreSQL databases.
pub struct SqlxMenuRepository {
    pool: DynDatabasePool,
}

impl SqlxMenuRepository {
    /// Create a new SQLx menu repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn MenuRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl MenuRepository for SqlxMenuRepository {
    async fn create(&self, item: &MenuItem) -> Result<MenuItem> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), item).await,
            DatabaseDriver::Postgres => {
                create_postgres(self.pool.as_postgres().unwrap(), item).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<MenuItem>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Postgres => {
                get_by_id_postgres(self.pool.as_postgres().unwrap(), id).await
            }
        }
    }

    async fn list(&self) -> Result<Vec<MenuItem>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Postgres => list_postgres(self.pool.as_postgres().unwrap()).await,
        }
    }

    async fn update(&self, item: &MenuItem) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_sqlite(self.pool.as_sqlite().unwrap(), item).await,
            DatabaseDriver::Postgres => {
                update_postgres(self.pool.as_postgres().unwrap(), item).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Postgres => delete_postgres(self.pool.as_postgres().unwrap(), id).await,
        }
    }

    async fn reorder(&self, moves: &[MenuOrderItem]) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => reorder_sqlite(self.pool.as_sqlite().unwrap(), moves).await,
            DatabaseDriver::Postgres => {
                reorder_postgres(self.pool.as_postgres().unwrap(), moves).await
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

const MENU_COLUMNS: &str =
    "id, parent_id, title, item_type, target, open_new_tab, sort_order, visible";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, item: &MenuItem) -> Result<MenuItem> {
    let result = sqlx::query(
        r#"
        INSERT INTO menu_items (parent_id, title, item_type, target, open_new_tab, sort_order, visible)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(item.parent_id)
    .bind(&item.title)
    .bind(item.item_type.to_string())
    .bind(&item.target)
    .bind(item.open_new_tab)
    .bind(item.sort_order)
    .bind(item.visible)
    .execute(pool)
    .await
    .context("Failed to create menu item")?;

    let mut created = item.clone();
    created.id = result.last_insert_rowid();
    Ok(created)
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<MenuItem>> {
    let sql = format!("SELECT {} FROM menu_items WHERE id = ?", MENU_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get menu item")?;

    match row {
        Some(row) => Ok(Some(row_to_menu_item_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_sqlite(pool: &SqlitePool) -> Result<Vec<MenuItem>> {
    let sql = format!(
        "SELECT {} FROM menu_items ORDER BY sort_order, id",
        MENU_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("Failed to list menu items")?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row_to_menu_item_sqlite(&row)?);
    }
    Ok(items)
}

async fn update_sqlite(pool: &SqlitePool, item: &MenuItem) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE menu_items
        SET parent_id = ?, title = ?, item_type = ?, target = ?, open_new_tab = ?,
            sort_order = ?, visible = ?
        WHERE id = ?
        "#,
    )
    .bind(item.parent_id)
    .bind(&item.title)
    .bind(item.item_type.to_string())
    .bind(&item.target)
    .bind(item.open_new_tab)
    .bind(item.sort_order)
    .bind(item.visible)
    .bind(item.id)
    .execute(pool)
    .await
    .context("Failed to update menu item")?;
    Ok(())
}

async fn delete_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM menu_items WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete menu item")?;
    Ok(result.rows_affected() > 0)
}

async fn reorder_sqlite(pool: &SqlitePool, moves: &[MenuOrderItem]) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    for m in moves {
        sqlx::query("UPDATE menu_items SET parent_id = ?, sort_order = ? WHERE id = ?")
            .bind(m.parent_id)
            .bind(m.sort_order)
            .bind(m.id)
            .execute(&mut *tx)
            .await
            .context("Failed to reorder menu item")?;
    }

    tx.commit().await.context("Failed to commit reorder")?;
    Ok(())
}

async fn count_all_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM menu_items")
        .fetch_one(pool)
        .await
        .context("Failed to count menu items")?;
    Ok(row.get("count"))
}

fn row_to_menu_item_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<MenuItem> {
    let type_str: String = row.get("item_type");
    let item_type = MenuItemType::from_str(&type_str)
        .map_err(|_| anyhow!("Invalid menu item type in database: {}", type_str))?;

    Ok(MenuItem {
        id: row.get("id"),
        parent_id: row.get("parent_id"),
        title: row.get("title"),
        item_type,
        target: row.get("target"),
        open_new_tab: row.get("open_new_tab"),
        sort_order: row.get("sort_order"),
        visible: row.get("visible"),
    })
}

// ============================================================================
// PostgreSQL implementations
// ============================================================================

async fn create_postgres(pool: &PgPool, item: &MenuItem) -> Result<MenuItem> {
    let row = sqlx::query(
        r#"
        INSERT INTO menu_items (parent_id, title, item_type, target, open_new_tab, sort_order, visible)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(item.parent_id)
    .bind(&item.title)
    .bind(item.item_type.to_string())
    .bind(&item.target)
    .bind(item.open_new_tab)
    .bind(item.sort_order)
    .bind(item.visible)
    .fetch_one(pool)
    .await
    .context("Failed to create menu item")?;

    let mut created = item.clone();
    created.id = row.get("id");
    Ok(created)
}

async fn get_by_id_postgres(pool: &PgPool, id: i64) -> Result<Option<MenuItem>> {
    let sql = format!("SELECT {} FROM menu_items WHERE id = $1", MENU_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get menu item")?;

    match row {
        Some(row) => Ok(Some(row_to_menu_item_postgres(&row)?)),
        None => Ok(None),
    }
}

async fn list_postgres(pool: &PgPool) -> Result<Vec<MenuItem>> {
    let sql = format!(
        "SELECT {} FROM menu_items ORDER BY sort_order, id",
        MENU_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("Failed to list menu items")?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row_to_menu_item_postgres(&row)?);
    }
    Ok(items)
}

async fn update_postgres(pool: &PgPool, item: &MenuItem) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE menu_items
        SET parent_id = $1, title = $2, item_type = $3, target = $4, open_new_tab = $5,
            sort_order = $6, visible = $7
        WHERE id = $8
        "#,
    )
    .bind(item.parent_id)
    .bind(&item.title)
    .bind(item.item_type.to_string())
    .bind(&item.target)
    .bind(item.open_new_tab)
    .bind(item.sort_order)
    .bind(item.visible)
    .bind(item.id)
    .execute(pool)
    .await
    .context("Failed to update menu item")?;
    Ok(())
}

async fn delete_postgres(pool: &PgPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM menu_items WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete menu item")?;
    Ok(result.rows_affected() > 0)
}

async fn reorder_postgres(pool: &PgPool, moves: &[MenuOrderItem]) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    for m in moves {
        sqlx::query("UPDATE menu_items SET parent_id = $1, sort_order = $2 WHERE id = $3")
            .bind(m.parent_id)
            .bind(m.sort_order)
            .bind(m.id)
            .execute(&mut *tx)
            .await
            .context("Failed to reorder menu item")?;
    }

    tx.commit().await.context("Failed to commit reorder")?;
    Ok(())
}

async fn count_all_postgres(pool: &PgPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM menu_items")
        .fetch_one(pool)
        .await
        .context("Failed to count menu items")?;
    Ok(row.get("count"))
}

fn row_to_menu_item_postgres(row: &sqlx::postgres::PgRow) -> Result<MenuItem> {
    let type_str: String = row.get("item_type");
    let item_type = MenuItemType::from_str(&type_str)
        .map_err(|_| anyhow!("Invalid menu item type in database: {}", type_str))?;

    Ok(MenuItem {
        id: row.get("id"),
        parent_id: row.get("parent_id"),
        title: row.get("title"),
        item_type,
        target: row.get("target"),
        open_new_tab: row.get("open_new_tab"),
        sort_order: row.get("sort_order"),
        visible: row.get("visible"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxMenuRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxMenuRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = setup().await;

        let created = repo
            .create(&MenuItem::new(
                "Home".into(),
                MenuItemType::Builtin,
                "home".into(),
            ))
            .await
            .expect("Failed to create menu item");

        assert!(created.id > 0);

        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.title, "Home");
        assert_eq!(found.item_type, MenuItemType::Builtin);
        assert!(found.visible);
    }

    #[tokio::test]
    async fn test_list_ordered() {
        let repo = setup().await;

        let mut second = MenuItem::new("Second".into(), MenuItemType::Builtin, "tags".into());
        second.sort_order = 2;
        let mut first = MenuItem::new("First".into(), MenuItemType::Builtin, "home".into());
        first.sort_order = 1;

        repo.create(&second).await.unwrap();
        repo.create(&first).await.unwrap();

        let items = repo.list().await.unwrap();
        assert_eq!(items[0].title, "First");
        assert_eq!(items[1].title, "Second");
    }

    #[tokio::test]
    async fn test_update() {
        let repo = setup().await;
        let mut item = repo
            .create(&MenuItem::new(
                "Old".into(),
                MenuItemType::External,
                "https://example.com".into(),
            ))
            .await
            .unwrap();

        item.title = "New".into();
        item.visible = false;
        repo.update(&item).await.unwrap();

        let reloaded = repo.get_by_id(item.id).await.unwrap().unwrap();
        assert_eq!(reloaded.title, "New");
        assert!(!reloaded.visible);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_children() {
        let repo = setup().await;

        let parent = repo
            .create(&MenuItem::new(
                "Parent".into(),
                MenuItemType::Builtin,
                "home".into(),
            ))
            .await
            .unwrap();
        let mut child = MenuItem::new("Child".into(), MenuItemType::Builtin, "tags".into());
        child.parent_id = Some(parent.id);
        let child = repo.create(&child).await.unwrap();

        assert!(repo.delete(parent.id).await.unwrap());
        assert!(repo.get_by_id(child.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reorder() {
        let repo = setup().await;

        let a = repo
            .create(&MenuItem::new("A".into(), MenuItemType::Builtin, "home".into()))
            .await
            .unwrap();
        let b = repo
            .create(&MenuItem::new("B".into(), MenuItemType::Builtin, "tags".into()))
            .await
            .unwrap();

        repo.reorder(&[
            MenuOrderItem {
                id: a.id,
                parent_id: None,
                sort_order: 2,
            },
            MenuOrderItem {
                id: b.id,
                parent_id: None,
                sort_order: 1,
            },
        ])
        .await
        .unwrap();

        let items = repo.list().await.unwrap();
        assert_eq!(items[0].title, "B");
        assert_eq!(items[1].title, "A");
    }
}
