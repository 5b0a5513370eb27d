//! Media API endpoints (admin)
//!
//! - POST /api/v1/admin/media - Upload a file (multipart, field "file")
//! - GET /api/v1/admin/media - List the media library
//! - GET /api/v1/admin/media/{id} - Get one media item
//! - DELETE /api/v1/admin/media/{id} - Delete a media item and its file

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{ListParams, MediaItem};

/// Query parameters for the media list
#[derive(Debug, Deserialize)]
pub struct ListMediaQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    24
}

/// Response for the media list
#[derive(Debug, Serialize)]
pub struct MediaListResponse {
    pub items: Vec<MediaItem>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

/// Build the admin media router
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_media).post(upload))
        .route("/{id}", get(get_media).delete(delete_media))
}

/// POST /api/v1/admin/media - Upload a file
///
/// Accepts multipart/form-data with a single file field named "file".
async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<MediaItem>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("Failed to read multipart: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name != "file" {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation_error(format!("Failed to read file: {}", e)))?;

        let item = state
            .media_service
            .store(&filename, &content_type, &data)
            .await?;

        return Ok((StatusCode::CREATED, Json(item)));
    }

    Err(ApiError::validation_error("No file provided"))
}

/// GET /api/v1/admin/media - List the media library, newest first
async fn list_media(
    State(state): State<AppState>,
    Query(query): Query<ListMediaQuery>,
) -> Result<Json<MediaListResponse>, ApiError> {
    let params = ListParams::new(query.page, query.page_size);
    let result = state.media_service.list(&params).await?;

    let total = result.total;
    let page = result.page;
    let page_size = result.per_page;
    let total_pages = result.total_pages();

    Ok(Json(MediaListResponse {
        items: result.items,
        total,
        page,
        page_size,
        total_pages,
    }))
}

/// GET /api/v1/admin/media/{id} - Get one media item
async fn get_media(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MediaItem>, ApiError> {
    let item = state
        .media_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Media item not found: {}", id)))?;
    Ok(Json(item))
}

/// DELETE /api/v1/admin/media/{id} - Delete a media item and its file
async fn delete_media(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.media_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
