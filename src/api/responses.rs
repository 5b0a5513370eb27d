//! Shared API response types
//!
//! Common response structures used across multiple API endpoints to keep
//! the wire format consistent.

use serde::{Deserialize, Serialize};

use crate::services::markdown::TocEntry;

// ============================================================================
// Post Response Types
// ============================================================================

/// Full post response with all fields, used in detail endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub content_html: String,
    pub excerpt: String,
    pub category_id: i64,
    pub status: String,
    pub published_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub view_count: i64,
    pub comment_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub is_pinned: bool,
    pub pin_order: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toc: Option<Vec<TocEntry>>,
}

/// Simplified post response for list views
#[derive(Debug, Serialize)]
pub struct PostSummary {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub status: String,
    pub published_at: Option<String>,
    pub created_at: String,
    pub view_count: i64,
    pub comment_count: i64,
    pub is_pinned: bool,
}

/// Category info embedded in post responses
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CategoryInfo {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

/// Tag info embedded in post responses
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TagInfo {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

// ============================================================================
// Pagination Response Types
// ============================================================================

/// Paginated post list response
#[derive(Debug, Serialize)]
pub struct PaginatedPostsResponse {
    pub posts: Vec<PostSummary>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

// ============================================================================
// Conversions
// ============================================================================

impl From<crate::models::Post> for PostResponse {
    fn from(post: crate::models::Post) -> Self {
        Self {
            id: post.id,
            slug: post.slug,
            title: post.title,
            content: post.content,
            content_html: post.content_html,
            excerpt: post.excerpt,
            category_id: post.category_id,
            status: post.status.to_string(),
            published_at: post.published_at.map(|dt| dt.to_rfc3339()),
            created_at: post.created_at.to_rfc3339(),
            updated_at: post.updated_at.to_rfc3339(),
            view_count: post.view_count,
            comment_count: post.comment_count,
            thumbnail: post.thumbnail,
            is_pinned: post.is_pinned,
            pin_order: post.pin_order,
            category: None,
            tags: None,
            toc: None,
        }
    }
}

impl From<crate::models::Post> for PostSummary {
    fn from(post: crate::models::Post) -> Self {
        Self {
            id: post.id,
            slug: post.slug,
            title: post.title,
            excerpt: post.excerpt,
            status: post.status.to_string(),
            published_at: post.published_at.map(|dt| dt.to_rfc3339()),
            created_at: post.created_at.to_rfc3339(),
            view_count: post.view_count,
            comment_count: post.comment_count,
            is_pinned: post.is_pinned,
        }
    }
}

impl From<crate::models::PagedResult<crate::models::Post>> for PaginatedPostsResponse {
    fn from(result: crate::models::PagedResult<crate::models::Post>) -> Self {
        let total = result.total;
        let page = result.page;
        let page_size = result.per_page;
        let total_pages = result.total_pages();
        Self {
            posts: result.items.into_iter().map(Into::into).collect(),
            total,
            page,
            page_size,
            total_pages,
        }
    }
}

impl PostResponse {
    /// Add category info to the response
    pub fn with_category(mut self, category: Option<crate::models::Category>) -> Self {
        self.category = category.map(|c| CategoryInfo {
            id: c.id,
            slug: c.slug,
            name: c.name,
        });
        self
    }

    /// Add tags info to the response
    pub fn with_tags(mut self, tags: Vec<crate::models::Tag>) -> Self {
        self.tags = Some(
            tags.into_iter()
                .map(|t| TagInfo {
                    id: t.id,
                    slug: t.slug,
                    name: t.name,
                })
                .collect(),
        );
        self
    }

    /// Add table of contents to the response
    pub fn with_toc(mut self, toc: Vec<TocEntry>) -> Self {
        if !toc.is_empty() {
            self.toc = Some(toc);
        }
        self
    }
}
