//! Menu API endpoints
//!
//! Public:
//! - GET /api/v1/menu - Visible menu tree
//!
//! Admin:
//! - GET /api/v1/admin/menu - All menu items (flat)
//! - POST /api/v1/admin/menu - Create a menu item
//! - PUT /api/v1/admin/menu/order - Batch reorder
//! - PUT /api/v1/admin/menu/{id} - Update a menu item
//! - DELETE /api/v1/admin/menu/{id} - Delete a menu item

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};
use crate::models::{
    CreateMenuItemInput, MenuItem, MenuTree, UpdateMenuItemInput, UpdateMenuOrderInput,
};

/// Response for the menu tree
#[derive(Debug, Serialize)]
pub struct MenuTreeResponse {
    pub items: Vec<MenuTree>,
}

/// Response for the flat admin list
#[derive(Debug, Serialize)]
pub struct MenuListResponse {
    pub items: Vec<MenuItem>,
}

/// Build the public menu router
pub fn public_router() -> Router<AppState> {
    Router::new().route("/", get(get_public_tree))
}

/// Build the admin menu router
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/order", put(reorder))
        .route("/{id}", put(update_item).delete(delete_item))
}

/// GET /api/v1/menu - Visible menu tree for the public site
async fn get_public_tree(
    State(state): State<AppState>,
) -> Result<Json<MenuTreeResponse>, ApiError> {
    let items = state.menu_service.tree(true).await?;
    Ok(Json(MenuTreeResponse { items }))
}

/// GET /api/v1/admin/menu - All menu items, flat
async fn list_items(State(state): State<AppState>) -> Result<Json<MenuListResponse>, ApiError> {
    let items = state.menu_service.list().await?;
    Ok(Json(MenuListResponse { items }))
}

/// POST /api/v1/admin/menu - Create a menu item
async fn create_item(
    State(state): State<AppState>,
    Json(input): Json<CreateMenuItemInput>,
) -> Result<(StatusCode, Json<MenuItem>), ApiError> {
    let item = state.menu_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /api/v1/admin/menu/order - Batch reorder
async fn reorder(
    State(state): State<AppState>,
    Json(input): Json<UpdateMenuOrderInput>,
) -> Result<StatusCode, ApiError> {
    state.menu_service.reorder(input).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/admin/menu/{id} - Update a menu item
async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateMenuItemInput>,
) -> Result<Json<MenuItem>, ApiError> {
    let item = state.menu_service.update(id, input).await?;
    Ok(Json(item))
}

/// DELETE /api/v1/admin/menu/{id} - Delete a menu item (children cascade)
async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.menu_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
