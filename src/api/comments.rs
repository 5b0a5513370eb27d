//! Comment API endpoints
//!
//! Public:
//! - GET /api/v1/comments/{post_id} - Threaded comments of a post
//! - POST /api/v1/comments - Create a comment (rate limited per IP)
//!
//! Admin:
//! - GET /api/v1/admin/comments - Recent comments across all posts
//! - DELETE /api/v1/admin/comments/{id} - Delete a comment

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::str::FromStr;

use crate::api::middleware::{extract_client_ip, ApiError, AppState};
use crate::models::{Comment, CommentThread, CreateCommentInput};

/// Query parameters for the admin comment list
#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

/// Response for a post's comments
#[derive(Debug, Serialize)]
pub struct CommentsResponse {
    pub comments: Vec<CommentThread>,
}

/// Response for the admin comment list
#[derive(Debug, Serialize)]
pub struct RecentCommentsResponse {
    pub comments: Vec<Comment>,
}

/// Build the public comments router
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_comment))
        .route("/{post_id}", get(get_comments))
}

/// Build the admin comments router
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_recent))
        .route("/{id}", delete(delete_comment))
}

/// GET /api/v1/comments/{post_id} - Threaded comments of a post
async fn get_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<CommentsResponse>, ApiError> {
    let comments = state.comment_service.get_threads(post_id).await?;
    Ok(Json(CommentsResponse { comments }))
}

/// POST /api/v1/comments - Create a comment
///
/// Submissions are rate limited per client IP.
async fn create_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateCommentInput>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let ip = extract_client_ip(&headers);

    if let Some(addr) = ip.as_deref().and_then(|s| IpAddr::from_str(s).ok()) {
        if state.comment_limiter.is_limited(addr).await {
            return Err(ApiError::rate_limited(
                "Too many comments, slow down a little",
            ));
        }
        state.comment_limiter.record(addr).await;
    }

    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let comment = state.comment_service.create(input, ip, user_agent).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// GET /api/v1/admin/comments - Recent comments across all posts
async fn list_recent(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<RecentCommentsResponse>, ApiError> {
    let comments = state.comment_service.list_recent(query.limit).await?;
    Ok(Json(RecentCommentsResponse { comments }))
}

/// DELETE /api/v1/admin/comments/{id} - Delete a comment (replies cascade)
async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.comment_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
