//! Widget API endpoints (admin)
//!
//! - GET /api/v1/admin/widgets - All widgets
//! - POST /api/v1/admin/widgets - Create a widget
//! - PUT /api/v1/admin/widgets/order - Batch reorder
//! - PUT /api/v1/admin/widgets/{id} - Update a widget
//! - DELETE /api/v1/admin/widgets/{id} - Delete a widget

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};
use crate::models::{CreateWidgetInput, UpdateWidgetInput, UpdateWidgetOrderInput, Widget};

/// Response for the widget list
#[derive(Debug, Serialize)]
pub struct WidgetListResponse {
    pub widgets: Vec<Widget>,
}

/// Build the admin widgets router
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_widgets).post(create_widget))
        .route("/order", put(reorder))
        .route("/{id}", put(update_widget).delete(delete_widget))
}

/// GET /api/v1/admin/widgets - All widgets, ordered by area then position
async fn list_widgets(
    State(state): State<AppState>,
) -> Result<Json<WidgetListResponse>, ApiError> {
    let widgets = state.widget_service.list().await?;
    Ok(Json(WidgetListResponse { widgets }))
}

/// POST /api/v1/admin/widgets - Create a widget
async fn create_widget(
    State(state): State<AppState>,
    Json(input): Json<CreateWidgetInput>,
) -> Result<(StatusCode, Json<Widget>), ApiError> {
    let widget = state.widget_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(widget)))
}

/// PUT /api/v1/admin/widgets/order - Batch reorder
async fn reorder(
    State(state): State<AppState>,
    Json(input): Json<UpdateWidgetOrderInput>,
) -> Result<StatusCode, ApiError> {
    state.widget_service.reorder(input).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/admin/widgets/{id} - Update a widget
async fn update_widget(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateWidgetInput>,
) -> Result<Json<Widget>, ApiError> {
    let widget = state.widget_service.update(id, input).await?;
    Ok(Json(widget))
}

/// DELETE /api/v1/admin/widgets/{id} - Delete a widget
async fn delete_widget(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.widget_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
