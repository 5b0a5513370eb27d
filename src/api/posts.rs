//! Post API endpoints
//!
//! Public:
//! - GET /api/v1/posts - List published posts
//! - GET /api/v1/posts/{slug} - Get a published post
//!
//! Admin:
//! - GET /api/v1/admin/posts - List posts of any status
//! - POST /api/v1/admin/posts - Create a post
//! - GET /api/v1/admin/posts/{id} - Get a post by id
//! - PUT /api/v1/admin/posts/{id} - Update a post
//! - DELETE /api/v1/admin/posts/{id} - Delete a post
//! - POST /api/v1/admin/posts/render - Markdown preview

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{PaginatedPostsResponse, PostResponse};
use crate::models::{CreatePostInput, ListParams, PostFilter, PostStatus, UpdatePostInput};

/// Query parameters for listing posts
#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Admin listing only: filter by status
    pub status: Option<String>,
    pub category_id: Option<i64>,
    pub tag_id: Option<i64>,
    pub search: Option<String>,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    10
}

impl ListPostsQuery {
    fn params(&self) -> ListParams {
        ListParams::new(self.page, self.page_size)
    }
}

/// Request for rendering a Markdown preview
#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    pub content: String,
}

/// Response for a rendered preview
#[derive(Debug, Serialize)]
pub struct RenderResponse {
    pub html: String,
}

/// Build the public posts router
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_published))
        .route("/{slug}", get(get_published))
}

/// Build the admin posts router
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_list).post(create_post))
        .route("/render", post(render_preview))
        .route(
            "/{id}",
            get(admin_get).put(update_post).delete(delete_post),
        )
}

/// GET /api/v1/posts - List published posts
async fn list_published(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<PaginatedPostsResponse>, ApiError> {
    let filter = PostFilter {
        category_id: query.category_id,
        tag_id: query.tag_id,
        search: query.search.clone(),
        ..PostFilter::published()
    };

    let result = state.post_service.list(&filter, &query.params()).await?;
    Ok(Json(result.into()))
}

/// GET /api/v1/posts/{slug} - Get a published post with category, tags and TOC
async fn get_published(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state
        .post_service
        .get_published_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Post not found: {}", slug)))?;

    let category = state.category_service.get_by_id(post.category_id).await?;
    let tags = state.post_service.get_tags(post.id).await?;
    let toc = state.post_service.table_of_contents(&post);

    let response = PostResponse::from(post)
        .with_category(category)
        .with_tags(tags)
        .with_toc(toc);

    Ok(Json(response))
}

/// GET /api/v1/admin/posts - List posts of any status
async fn admin_list(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<PaginatedPostsResponse>, ApiError> {
    let status = match query.status.as_deref() {
        None | Some("") | Some("all") => None,
        Some(s) => Some(
            PostStatus::parse(s)
                .ok_or_else(|| ApiError::validation_error(format!("Unknown status: {}", s)))?,
        ),
    };

    let filter = PostFilter {
        status,
        category_id: query.category_id,
        tag_id: query.tag_id,
        search: query.search.clone(),
    };

    let result = state.post_service.list(&filter, &query.params()).await?;
    Ok(Json(result.into()))
}

/// POST /api/v1/admin/posts - Create a post
async fn create_post(
    State(state): State<AppState>,
    Json(input): Json<CreatePostInput>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    let post = state.post_service.create(input).await?;
    let tags = state.post_service.get_tags(post.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(PostResponse::from(post).with_tags(tags)),
    ))
}

/// GET /api/v1/admin/posts/{id} - Get a post of any status
async fn admin_get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state
        .post_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Post not found: {}", id)))?;

    let category = state.category_service.get_by_id(post.category_id).await?;
    let tags = state.post_service.get_tags(post.id).await?;

    Ok(Json(
        PostResponse::from(post)
            .with_category(category)
            .with_tags(tags),
    ))
}

/// PUT /api/v1/admin/posts/{id} - Update a post
async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdatePostInput>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.post_service.update(id, input).await?;
    let tags = state.post_service.get_tags(post.id).await?;
    Ok(Json(PostResponse::from(post).with_tags(tags)))
}

/// DELETE /api/v1/admin/posts/{id} - Delete a post
async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.post_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/admin/posts/render - Render Markdown for the editor preview
async fn render_preview(
    State(state): State<AppState>,
    Json(req): Json<RenderRequest>,
) -> Json<RenderResponse> {
    let html = state.post_service.render_markdown(&req.content);
    Json(RenderResponse { html })
}
