//! Settings repository
//!
//! Key-value storage for site settings.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;

/// A setting key-value pair
#[derive(Debug, Clone)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Repository trait for settings operations
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Get a single setting by key
    async fn get(&self, key: &str) -> Result<Option<Setting>>;

    /// Get all settings
    async fn get_all(&self) -> Result<Vec<Setting>>;

    /// Get multiple settings by keys
    async fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, String>>;

    /// Set a single setting
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Set multiple settings at once
    async fn set_many(&self, settings: &HashMap<String, String>) -> Result<()>;

    /// Delete a setting
    async fn delete(&self, key: &str) -> Result<()>;
}

/// SQLx-based settings repository
pub struct SqlxSettingsRepository {
    pool: DynDatabasePool,
}

impl SqlxSettingsRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SettingsRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SettingsRepository for SqlxSettingsRepository {
    async fn get(&self, key: &str) -> Result<Option<Setting>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_sqlite(self.pool.as_sqlite().unwrap(), key).await,
            DatabaseDriver::Postgres => get_postgres(self.pool.as_postgres().unwrap(), key).await,
        }
    }

    async fn get_all(&self) -> Result<Vec<Setting>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_all_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Postgres => get_all_postgres(self.pool.as_postgres().unwrap()).await,
        }
    }

    async fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, String>> {
        let mut result = HashMap::new();
        for key in keys {
            if let Some(setting) = self.get(key).await? {
                result.insert(setting.key, setting.value);
            }
        }
        Ok(result)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => set_sqlite(self.pool.as_sqlite().unwrap(), key, value).await,
            DatabaseDriver::Postgres => {
                set_postgres(self.pool.as_postgres().unwrap(), key, value).await
            }
        }
    }

    async fn set_many(&self, settings: &HashMap<String, String>) -> Result<()> {
        for (key, value) in settings {
            self.set(key, value).await?;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_sqlite(self.pool.as_sqlite().unwrap(), key).await,
            DatabaseDriver::Postgres => {
                delete_postgres(self.pool.as_postgres().unwrap(), key).await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_sqlite(pool: &SqlitePool, key: &str) -> Result<Option<Setting>> {
    let row = sqlx::query("SELECT key, value, updated_at FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| Setting {
        key: r.get("key"),
        value: r.get("value"),
        updated_at: r.get("updated_at"),
    }))
}

async fn get_all_sqlite(pool: &SqlitePool) -> Result<Vec<Setting>> {
    let rows = sqlx::query("SELECT key, value, updated_at FROM settings ORDER BY key")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|r| Setting {
            key: r.get("key"),
            value: r.get("value"),
            updated_at: r.get("updated_at"),
        })
        .collect())
}

async fn set_sqlite(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

async fn delete_sqlite(pool: &SqlitePool, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM settings WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await?;
    Ok(())
}

// ============================================================================
// PostgreSQL implementations
// ============================================================================

async fn get_postgres(pool: &PgPool, key: &str) -> Result<Option<Setting>> {
    let row = sqlx::query("SELECT key, value, updated_at FROM settings WHERE key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| Setting {
        key: r.get("key"),
        value: r.get("value"),
        updated_at: r.get("updated_at"),
    }))
}

async fn get_all_postgres(pool: &PgPool) -> Result<Vec<Setting>> {
    let rows = sqlx::query("SELECT key, value, updated_at FROM settings ORDER BY key")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|r| Setting {
            key: r.get("key"),
            value: r.get("value"),
            updated_at: r.get("updated_at"),
        })
        .collect())
}

async fn set_postgres(pool: &PgPool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value, updated_at) VALUES ($1, $2, NOW())
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

async fn delete_postgres(pool: &PgPool, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM settings WHERE key = $1")
        .bind(key)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxSettingsRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxSettingsRepository::new(pool)
    }

    #[tokio::test]
    async fn test_get_seeded_setting() {
        let repo = setup().await;

        let setting = repo
            .get("site_name")
            .await
            .expect("Failed to get setting")
            .expect("site_name should be seeded");
        assert_eq!(setting.value, "Pressroom");
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let repo = setup().await;

        repo.set("custom_key", "custom_value")
            .await
            .expect("Failed to set");

        let setting = repo
            .get("custom_key")
            .await
            .expect("Failed to get")
            .expect("Setting not found");
        assert_eq!(setting.value, "custom_value");
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let repo = setup().await;

        repo.set("k", "v1").await.unwrap();
        repo.set("k", "v2").await.unwrap();

        let setting = repo.get("k").await.unwrap().unwrap();
        assert_eq!(setting.value, "v2");
    }

    #[tokio::test]
    async fn test_get_many() {
        let repo = setup().await;

        let values = repo
            .get_many(&["site_name", "posts_per_page", "missing_key"])
            .await
            .expect("Failed to get many");

        assert_eq!(values.get("site_name").map(String::as_str), Some("Pressroom"));
        assert_eq!(values.get("posts_per_page").map(String::as_str), Some("10"));
        assert!(!values.contains_key("missing_key"));
    }

    #[tokio::test]
    async fn test_set_many() {
        let repo = setup().await;

        let mut map = HashMap::new();
        map.insert("a".to_string(), "1".to_string());
        map.insert("b".to_string(), "2".to_string());
        repo.set_many(&map).await.expect("Failed to set many");

        assert_eq!(repo.get("a").await.unwrap().unwrap().value, "1");
        assert_eq!(repo.get("b").await.unwrap().unwrap().value, "2");
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = setup().await;

        repo.set("doomed", "x").await.unwrap();
        repo.delete("doomed").await.unwrap();

        assert!(repo.get("doomed").await.unwrap().is_none());
    }
}
