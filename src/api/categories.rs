//! Category API endpoints
//!
//! Public:
//! - GET /api/v1/categories - Category tree with post counts
//! - GET /api/v1/categories/{slug}/posts - Published posts in a category
//!
//! Admin:
//! - POST /api/v1/admin/categories - Create a category
//! - PUT /api/v1/admin/categories/{id} - Update a category
//! - DELETE /api/v1/admin/categories/{id} - Delete a category

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::PaginatedPostsResponse;
use crate::models::{Category, CategoryTree, CreateCategoryInput, ListParams, UpdateCategoryInput};

/// Query parameters for listing a category's posts
#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    10
}

/// Response for the category tree
#[derive(Debug, Serialize)]
pub struct CategoryTreeResponse {
    pub categories: Vec<CategoryTree>,
}

/// Build the public categories router
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_tree))
        .route("/{slug}/posts", get(get_category_posts))
}

/// Build the admin categories router
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_category))
        .route("/{id}", axum::routing::put(update_category).delete(delete_category))
}

/// GET /api/v1/categories - Category tree with post counts
async fn get_tree(
    State(state): State<AppState>,
) -> Result<Json<CategoryTreeResponse>, ApiError> {
    let categories = state.category_service.tree().await?;
    Ok(Json(CategoryTreeResponse { categories }))
}

/// GET /api/v1/categories/{slug}/posts - Published posts in a category
async fn get_category_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<PaginatedPostsResponse>, ApiError> {
    let category = state
        .category_service
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Category not found: {}", slug)))?;

    let params = ListParams::new(query.page, query.page_size);
    let result = state
        .post_service
        .list_by_category(category.id, &params)
        .await?;

    Ok(Json(result.into()))
}

/// POST /api/v1/admin/categories - Create a category
async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<CreateCategoryInput>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state.category_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/v1/admin/categories/{id} - Update a category
async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateCategoryInput>,
) -> Result<Json<Category>, ApiError> {
    let category = state.category_service.update(id, input).await?;
    Ok(Json(category))
}

/// DELETE /api/v1/admin/categories/{id} - Delete a category
///
/// Posts move to the default category; children detach to the root.
async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.category_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
