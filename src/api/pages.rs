//! Page API endpoints
//!
//! Public:
//! - GET /api/v1/pages/{slug} - Get a published page
//!
//! Admin:
//! - GET /api/v1/admin/pages - List all pages
//! - POST /api/v1/admin/pages - Create a page
//! - GET /api/v1/admin/pages/{id} - Get a page by id
//! - PUT /api/v1/admin/pages/{id} - Update a page
//! - DELETE /api/v1/admin/pages/{id} - Delete a page

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};
use crate::models::{CreatePageInput, Page, UpdatePageInput};

/// Response for the page list
#[derive(Debug, Serialize)]
pub struct PageListResponse {
    pub pages: Vec<Page>,
}

/// Build the public pages router
pub fn public_router() -> Router<AppState> {
    Router::new().route("/{slug}", get(get_published))
}

/// Build the admin pages router
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_pages).post(create_page))
        .route("/{id}", get(get_page).put(update_page).delete(delete_page))
}

/// GET /api/v1/pages/{slug} - Get a published page
async fn get_published(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Page>, ApiError> {
    let page = state
        .page_service
        .get_published_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Page not found: {}", slug)))?;
    Ok(Json(page))
}

/// GET /api/v1/admin/pages - List all pages
async fn list_pages(State(state): State<AppState>) -> Result<Json<PageListResponse>, ApiError> {
    let pages = state.page_service.list().await?;
    Ok(Json(PageListResponse { pages }))
}

/// POST /api/v1/admin/pages - Create a page
async fn create_page(
    State(state): State<AppState>,
    Json(input): Json<CreatePageInput>,
) -> Result<(StatusCode, Json<Page>), ApiError> {
    let page = state.page_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(page)))
}

/// GET /api/v1/admin/pages/{id} - Get a page of any status
async fn get_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Page>, ApiError> {
    let page = state
        .page_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Page not found: {}", id)))?;
    Ok(Json(page))
}

/// PUT /api/v1/admin/pages/{id} - Update a page
async fn update_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdatePageInput>,
) -> Result<Json<Page>, ApiError> {
    let page = state.page_service.update(id, input).await?;
    Ok(Json(page))
}

/// DELETE /api/v1/admin/pages/{id} - Delete a page
async fn delete_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.page_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
