//! Settings service
//!
//! Business logic for site settings and appearance values stored in the
//! key-value settings table.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::db::repositories::SettingsRepository;

/// Known setting keys
pub mod keys {
    pub const SITE_NAME: &str = "site_name";
    pub const SITE_DESCRIPTION: &str = "site_description";
    pub const SITE_SUBTITLE: &str = "site_subtitle";
    pub const SITE_FOOTER: &str = "site_footer";
    pub const POSTS_PER_PAGE: &str = "posts_per_page";
    pub const ACTIVE_THEME: &str = "active_theme";
    pub const CUSTOM_CSS: &str = "custom_css";
    pub const CUSTOM_JS: &str = "custom_js";
}

/// Site settings structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSettings {
    pub site_name: String,
    pub site_description: String,
    pub site_subtitle: String,
    pub site_footer: String,
    pub posts_per_page: u32,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            site_name: "Pressroom".to_string(),
            site_description: "A blog powered by Pressroom".to_string(),
            site_subtitle: String::new(),
            site_footer: String::new(),
            posts_per_page: 10,
        }
    }
}

/// Appearance settings for the public site
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppearanceSettings {
    /// Active theme name (empty means the configured default)
    pub active_theme: String,
    pub custom_css: String,
    pub custom_js: String,
}

/// Settings service errors
#[derive(Debug, Error)]
pub enum SettingsServiceError {
    #[error("Failed to load settings: {0}")]
    LoadError(String),

    #[error("Failed to save settings: {0}")]
    SaveError(String),

    #[error("Invalid setting value: {0}")]
    InvalidValue(String),
}

/// Settings service for managing site configuration
pub struct SettingsService {
    repo: Arc<dyn SettingsRepository>,
}

impl SettingsService {
    /// Create a new settings service
    pub fn new(repo: Arc<dyn SettingsRepository>) -> Self {
        Self { repo }
    }

    /// Get all site settings
    pub async fn get_site_settings(&self) -> Result<SiteSettings, SettingsServiceError> {
        let keys = &[
            keys::SITE_NAME,
            keys::SITE_DESCRIPTION,
            keys::SITE_SUBTITLE,
            keys::SITE_FOOTER,
            keys::POSTS_PER_PAGE,
        ];

        let settings = self
            .repo
            .get_many(keys)
            .await
            .map_err(|e| SettingsServiceError::LoadError(e.to_string()))?;

        let defaults = SiteSettings::default();

        Ok(SiteSettings {
            site_name: settings
                .get(keys::SITE_NAME)
                .cloned()
                .unwrap_or(defaults.site_name),
            site_description: settings
                .get(keys::SITE_DESCRIPTION)
                .cloned()
                .unwrap_or(defaults.site_description),
            site_subtitle: settings
                .get(keys::SITE_SUBTITLE)
                .cloned()
                .unwrap_or(defaults.site_subtitle),
            site_footer: settings
                .get(keys::SITE_FOOTER)
                .cloned()
                .unwrap_or(defaults.site_footer),
            posts_per_page: settings
                .get(keys::POSTS_PER_PAGE)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.posts_per_page),
        })
    }

    /// Update site settings
    pub async fn update_site_settings(
        &self,
        settings: &SiteSettings,
    ) -> Result<(), SettingsServiceError> {
        if settings.site_name.trim().is_empty() {
            return Err(SettingsServiceError::InvalidValue(
                "Site name cannot be empty".to_string(),
            ));
        }
        if !(1..=100).contains(&settings.posts_per_page) {
            return Err(SettingsServiceError::InvalidValue(
                "posts_per_page must be between 1 and 100".to_string(),
            ));
        }

        let mut map = HashMap::new();
        map.insert(keys::SITE_NAME.to_string(), settings.site_name.clone());
        map.insert(
            keys::SITE_DESCRIPTION.to_string(),
            settings.site_description.clone(),
        );
        map.insert(
            keys::SITE_SUBTITLE.to_string(),
            settings.site_subtitle.clone(),
        );
        map.insert(keys::SITE_FOOTER.to_string(), settings.site_footer.clone());
        map.insert(
            keys::POSTS_PER_PAGE.to_string(),
            settings.posts_per_page.to_string(),
        );

        self.repo
            .set_many(&map)
            .await
            .map_err(|e| SettingsServiceError::SaveError(e.to_string()))?;

        Ok(())
    }

    /// Get appearance settings
    pub async fn get_appearance(&self) -> Result<AppearanceSettings, SettingsServiceError> {
        let keys = &[keys::ACTIVE_THEME, keys::CUSTOM_CSS, keys::CUSTOM_JS];
        let settings = self
            .repo
            .get_many(keys)
            .await
            .map_err(|e| SettingsServiceError::LoadError(e.to_string()))?;

        Ok(AppearanceSettings {
            active_theme: settings.get(keys::ACTIVE_THEME).cloned().unwrap_or_default(),
            custom_css: settings.get(keys::CUSTOM_CSS).cloned().unwrap_or_default(),
            custom_js: settings.get(keys::CUSTOM_JS).cloned().unwrap_or_default(),
        })
    }

    /// Update appearance settings
    pub async fn update_appearance(
        &self,
        appearance: &AppearanceSettings,
    ) -> Result<(), SettingsServiceError> {
        let mut map = HashMap::new();
        map.insert(
            keys::ACTIVE_THEME.to_string(),
            appearance.active_theme.clone(),
        );
        map.insert(keys::CUSTOM_CSS.to_string(), appearance.custom_css.clone());
        map.insert(keys::CUSTOM_JS.to_string(), appearance.custom_js.clone());

        self.repo
            .set_many(&map)
            .await
            .map_err(|e| SettingsServiceError::SaveError(e.to_string()))?;

        Ok(())
    }

    /// Get a single setting value
    pub async fn get(&self, key: &str) -> Result<Option<String>, SettingsServiceError> {
        let setting = self
            .repo
            .get(key)
            .await
            .map_err(|e| SettingsServiceError::LoadError(e.to_string()))?;
        Ok(setting.map(|s| s.value))
    }

    /// Set a single setting value
    pub async fn set(&self, key: &str, value: &str) -> Result<(), SettingsServiceError> {
        self.repo
            .set(key, value)
            .await
            .map_err(|e| SettingsServiceError::SaveError(e.to_string()))?;
        Ok(())
    }

    /// Get all settings as a HashMap
    pub async fn get_all_settings(
        &self,
    ) -> Result<HashMap<String, String>, SettingsServiceError> {
        let settings = self
            .repo
            .get_all()
            .await
            .map_err(|e| SettingsServiceError::LoadError(e.to_string()))?;
        Ok(settings.into_iter().map(|s| (s.key, s.value)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxSettingsRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SettingsService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SettingsService::new(SqlxSettingsRepository::boxed(pool))
    }

    #[tokio::test]
    async fn test_get_site_settings_uses_seeded_values() {
        let service = setup().await;

        let settings = service.get_site_settings().await.unwrap();
        assert_eq!(settings.site_name, "Pressroom");
        assert_eq!(settings.posts_per_page, 10);
    }

    #[tokio::test]
    async fn test_update_site_settings_roundtrip() {
        let service = setup().await;

        let updated = SiteSettings {
            site_name: "My Blog".to_string(),
            site_description: "Words".to_string(),
            site_subtitle: "and more words".to_string(),
            site_footer: "© nobody".to_string(),
            posts_per_page: 25,
        };
        service.update_site_settings(&updated).await.unwrap();

        let reloaded = service.get_site_settings().await.unwrap();
        assert_eq!(reloaded.site_name, "My Blog");
        assert_eq!(reloaded.posts_per_page, 25);
        assert_eq!(reloaded.site_footer, "© nobody");
    }

    #[tokio::test]
    async fn test_update_rejects_empty_site_name() {
        let service = setup().await;

        let mut settings = SiteSettings::default();
        settings.site_name = "  ".to_string();
        let result = service.update_site_settings(&settings).await;
        assert!(matches!(
            result,
            Err(SettingsServiceError::InvalidValue(_))
        ));
    }

    #[tokio::test]
    async fn test_update_rejects_bad_posts_per_page() {
        let service = setup().await;

        let mut settings = SiteSettings::default();
        settings.posts_per_page = 0;
        assert!(service.update_site_settings(&settings).await.is_err());

        settings.posts_per_page = 500;
        assert!(service.update_site_settings(&settings).await.is_err());
    }

    #[tokio::test]
    async fn test_appearance_roundtrip() {
        let service = setup().await;

        let appearance = AppearanceSettings {
            active_theme: "dark".to_string(),
            custom_css: "body { color: red; }".to_string(),
            custom_js: String::new(),
        };
        service.update_appearance(&appearance).await.unwrap();

        let reloaded = service.get_appearance().await.unwrap();
        assert_eq!(reloaded.active_theme, "dark");
        assert_eq!(reloaded.custom_css, "body { color: red; }");
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let service = setup().await;
        assert!(service.get("nonexistent").await.unwrap().is_none());
    }
}
