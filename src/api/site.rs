//! Site settings and appearance API endpoints
//!
//! Public:
//! - GET /api/v1/site/info - Public site information
//!
//! Admin:
//! - GET /api/v1/admin/settings - All settings
//! - PUT /api/v1/admin/settings - Update site settings
//! - GET /api/v1/admin/appearance - Appearance settings
//! - PUT /api/v1/admin/appearance - Update appearance (switches theme)
//! - GET /api/v1/admin/themes - Installed themes

use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use serde::Serialize;
use std::collections::HashMap;

use crate::api::middleware::{ApiError, AppState};
use crate::services::{AppearanceSettings, SiteSettings};
use crate::theme::ThemeInfo;

/// Response for public site info
#[derive(Debug, Serialize)]
pub struct SiteInfoResponse {
    pub version: String,
    pub site_name: String,
    pub site_description: String,
    pub site_subtitle: String,
    pub site_footer: String,
    pub posts_per_page: u32,
    pub active_theme: String,
}

/// Response for the appearance endpoint, including the outcome of a
/// theme switch
#[derive(Debug, Serialize)]
pub struct AppearanceResponse {
    #[serde(flatten)]
    pub appearance: AppearanceSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_fallback: Option<String>,
}

/// Response for the theme list
#[derive(Debug, Serialize)]
pub struct ThemeListResponse {
    pub themes: Vec<ThemeInfo>,
    pub active: String,
}

/// Build the public site router
pub fn public_router() -> Router<AppState> {
    Router::new().route("/info", get(get_site_info))
}

/// Build the admin settings/appearance router
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/settings", get(get_settings).put(update_settings))
        .route("/appearance", get(get_appearance).put(update_appearance))
        .route("/themes", get(list_themes))
}

/// GET /api/v1/site/info - Public site information
async fn get_site_info(State(state): State<AppState>) -> Result<Json<SiteInfoResponse>, ApiError> {
    let settings = state
        .settings_service
        .get_site_settings()
        .await
        .unwrap_or_default();

    let active_theme = state
        .theme_engine
        .read()
        .map(|engine| engine.current_theme().to_string())
        .unwrap_or_default();

    Ok(Json(SiteInfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        site_name: settings.site_name,
        site_description: settings.site_description,
        site_subtitle: settings.site_subtitle,
        site_footer: settings.site_footer,
        posts_per_page: settings.posts_per_page,
        active_theme,
    }))
}

/// GET /api/v1/admin/settings - Every stored setting
async fn get_settings(
    State(state): State<AppState>,
) -> Result<Json<HashMap<String, String>>, ApiError> {
    let settings = state.settings_service.get_all_settings().await?;
    Ok(Json(settings))
}

/// PUT /api/v1/admin/settings - Update site settings
async fn update_settings(
    State(state): State<AppState>,
    Json(settings): Json<SiteSettings>,
) -> Result<Json<SiteSettings>, ApiError> {
    state.settings_service.update_site_settings(&settings).await?;
    Ok(Json(settings))
}

/// GET /api/v1/admin/appearance - Appearance settings
async fn get_appearance(
    State(state): State<AppState>,
) -> Result<Json<AppearanceResponse>, ApiError> {
    let appearance = state.settings_service.get_appearance().await?;
    Ok(Json(AppearanceResponse {
        appearance,
        theme_fallback: None,
    }))
}

/// PUT /api/v1/admin/appearance - Update appearance
///
/// Changing the active theme swaps templates immediately; a theme that
/// fails to load falls back to the default theme and the response says
/// so instead of failing the request.
async fn update_appearance(
    State(state): State<AppState>,
    Json(appearance): Json<AppearanceSettings>,
) -> Result<Json<AppearanceResponse>, ApiError> {
    let mut theme_fallback = None;

    if !appearance.active_theme.is_empty() {
        let mut engine = state
            .theme_engine
            .write()
            .map_err(|_| ApiError::internal_error("Theme engine lock poisoned"))?;

        if engine.current_theme() != appearance.active_theme {
            let result = engine.switch_theme(&appearance.active_theme);
            if !result.success {
                return Err(ApiError::validation_error(
                    result
                        .error
                        .unwrap_or_else(|| "Theme failed to load".to_string()),
                ));
            }
            if result.used_fallback {
                theme_fallback = Some(format!(
                    "Theme '{}' failed to load, fell back to '{}': {}",
                    appearance.active_theme,
                    engine.current_theme(),
                    result.error.unwrap_or_default()
                ));
            }
        }
    }

    let stored = AppearanceSettings {
        active_theme: if theme_fallback.is_some() {
            // Record the theme actually in use, not the broken request
            state
                .theme_engine
                .read()
                .map(|e| e.current_theme().to_string())
                .unwrap_or_default()
        } else {
            appearance.active_theme.clone()
        },
        custom_css: appearance.custom_css.clone(),
        custom_js: appearance.custom_js.clone(),
    };
    state.settings_service.update_appearance(&stored).await?;

    Ok(Json(AppearanceResponse {
        appearance: stored,
        theme_fallback,
    }))
}

/// GET /api/v1/admin/themes - Installed themes
async fn list_themes(State(state): State<AppState>) -> Result<Json<ThemeListResponse>, ApiError> {
    let engine = state
        .theme_engine
        .read()
        .map_err(|_| ApiError::internal_error("Theme engine lock poisoned"))?;

    Ok(Json(ThemeListResponse {
        themes: engine.list_themes(),
        active: engine.current_theme().to_string(),
    }))
}
