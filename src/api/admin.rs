//! Admin dashboard endpoints
//!
//! - GET /api/v1/admin/dashboard - Entity counts and server stats
//! - POST /api/v1/admin/cache/clear - Drop every cache entry

use axum::{extract::State, http::StatusCode, routing::{get, post}, Json, Router};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};
use crate::cache::CacheLayer;
use crate::models::PostStatus;

/// Dashboard summary response
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub posts: PostCounts,
    pub categories: i64,
    pub tags: i64,
    pub comments: i64,
    pub media: i64,
    pub pages: i64,
    pub server: ServerStats,
}

/// Post counts by status
#[derive(Debug, Serialize)]
pub struct PostCounts {
    pub total: i64,
    pub published: i64,
    pub draft: i64,
    pub archived: i64,
}

/// Server-side request statistics
#[derive(Debug, Serialize)]
pub struct ServerStats {
    pub version: String,
    pub uptime_seconds: u64,
    pub total_requests: u64,
    pub avg_response_time_us: f64,
}

/// Build the admin dashboard router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/cache/clear", post(clear_cache))
}

/// GET /api/v1/admin/dashboard - Entity counts and server stats
async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardResponse>, ApiError> {
    let (total, published, draft, archived, comments, media, pages) = futures::join!(
        state.post_service.count_all(),
        state.post_service.count_by_status(PostStatus::Published),
        state.post_service.count_by_status(PostStatus::Draft),
        state.post_service.count_by_status(PostStatus::Archived),
        state.comment_service.count_all(),
        state.media_service.count_all(),
        state.page_service.count_all(),
    );

    let categories = state.category_service.list().await?.len() as i64;
    let tags = state.tag_service.list().await?.len() as i64;

    Ok(Json(DashboardResponse {
        posts: PostCounts {
            total: total?,
            published: published?,
            draft: draft?,
            archived: archived?,
        },
        categories,
        tags,
        comments: comments?,
        media: media?,
        pages: pages?,
        server: ServerStats {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: state.request_stats.uptime_seconds(),
            total_requests: state.request_stats.total_requests(),
            avg_response_time_us: state.request_stats.avg_response_time_us(),
        },
    }))
}

/// POST /api/v1/admin/cache/clear - Drop every cache entry
async fn clear_cache(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state
        .cache
        .clear()
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;
    tracing::info!("Cache cleared by admin request");
    Ok(StatusCode::NO_CONTENT)
}
