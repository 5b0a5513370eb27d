//! Tag API endpoints
//!
//! Public:
//! - GET /api/v1/tags - Tag list or tag cloud
//! - GET /api/v1/tags/{slug}/posts - Published posts carrying a tag
//!
//! Admin:
//! - POST /api/v1/admin/tags - Create (or reuse) a tag
//! - DELETE /api/v1/admin/tags/{id} - Delete a tag
//! - GET /api/v1/admin/tags/duplicates - Likely duplicate pairs
//! - POST /api/v1/admin/tags/merge - Merge one tag into another

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::PaginatedPostsResponse;
use crate::models::{ListParams, TagDuplicate};

/// Query parameters for the tag list
#[derive(Debug, Deserialize)]
pub struct ListTagsQuery {
    /// If true, return the tag cloud with counts sorted by frequency
    #[serde(default)]
    pub cloud: bool,
    /// Limit for the tag cloud
    #[serde(default = "default_cloud_limit")]
    pub limit: usize,
}

fn default_cloud_limit() -> usize {
    50
}

/// Query parameters for listing a tag's posts
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

/// Query parameters for duplicate detection
#[derive(Debug, Deserialize)]
pub struct DuplicatesQuery {
    /// Similarity threshold in [0, 1]; defaults to 0.8
    pub threshold: Option<f64>,
}

/// Request body for a tag merge
#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub source_id: i64,
    pub target_id: i64,
}

/// Request body for creating a tag
#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
}

/// Response for the tag list
#[derive(Debug, Serialize)]
pub struct TagListResponse {
    pub tags: Vec<TagResponse>,
}

/// Response for a single tag
#[derive(Debug, Serialize)]
pub struct TagResponse {
    pub id: i64,
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_count: Option<i64>,
}

impl From<crate::models::Tag> for TagResponse {
    fn from(tag: crate::models::Tag) -> Self {
        Self {
            id: tag.id,
            slug: tag.slug,
            name: tag.name,
            post_count: None,
        }
    }
}

impl From<crate::models::TagWithCount> for TagResponse {
    fn from(twc: crate::models::TagWithCount) -> Self {
        Self {
            id: twc.tag.id,
            slug: twc.tag.slug,
            name: twc.tag.name,
            post_count: Some(twc.post_count),
        }
    }
}

/// Response for duplicate detection
#[derive(Debug, Serialize)]
pub struct DuplicatesResponse {
    pub duplicates: Vec<TagDuplicate>,
    pub threshold: f64,
}

/// Build the public tags router
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tags))
        .route("/{slug}/posts", get(get_tag_posts))
}

/// Build the admin tags router
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_tag))
        .route("/duplicates", get(find_duplicates))
        .route("/merge", post(merge_tags))
        .route("/{id}", delete(delete_tag))
}

/// GET /api/v1/tags - Get tag list or tag cloud
async fn list_tags(
    State(state): State<AppState>,
    Query(query): Query<ListTagsQuery>,
) -> Result<Json<TagListResponse>, ApiError> {
    let tags = if query.cloud {
        let cloud = state.tag_service.get_tag_cloud(query.limit).await?;
        cloud.into_iter().map(TagResponse::from).collect()
    } else {
        let list = state.tag_service.list().await?;
        list.into_iter().map(TagResponse::from).collect()
    };

    Ok(Json(TagListResponse { tags }))
}

/// GET /api/v1/tags/{slug}/posts - Published posts carrying a tag
async fn get_tag_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<PaginatedPostsResponse>, ApiError> {
    let tag = state
        .tag_service
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Tag not found: {}", slug)))?;

    let params = ListParams::new(query.page, query.page_size);
    let result = state.post_service.list_by_tag(tag.id, &params).await?;

    Ok(Json(result.into()))
}

/// POST /api/v1/admin/tags - Create (or reuse) a tag by name
async fn create_tag(
    State(state): State<AppState>,
    Json(req): Json<CreateTagRequest>,
) -> Result<(StatusCode, Json<TagResponse>), ApiError> {
    let tag = state.tag_service.create_or_get(&req.name).await?;
    Ok((StatusCode::CREATED, Json(tag.into())))
}

/// DELETE /api/v1/admin/tags/{id} - Delete a tag
async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.tag_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/admin/tags/duplicates - Report likely duplicate tag pairs
///
/// Pairs are scored with a string-similarity heuristic over normalized
/// names; pairs at or above the threshold come back strongest-first,
/// each with both tags' post counts so the caller can pick a merge
/// direction.
async fn find_duplicates(
    State(state): State<AppState>,
    Query(query): Query<DuplicatesQuery>,
) -> Result<Json<DuplicatesResponse>, ApiError> {
    let duplicates = state.tag_service.find_duplicates(query.threshold).await?;
    Ok(Json(DuplicatesResponse {
        duplicates,
        threshold: query
            .threshold
            .unwrap_or(crate::services::tag::DEFAULT_DUPLICATE_THRESHOLD),
    }))
}

/// POST /api/v1/admin/tags/merge - Merge the source tag into the target
async fn merge_tags(
    State(state): State<AppState>,
    Json(req): Json<MergeRequest>,
) -> Result<Json<TagResponse>, ApiError> {
    let survivor = state.tag_service.merge(req.source_id, req.target_id).await?;
    Ok(Json(survivor.into()))
}
