//! Post model
//!
//! This module provides:
//! - `Post` entity representing a blog post
//! - `PostStatus` enum for publication states
//! - Input types for creating and updating posts
//! - Pagination types for list queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier
    pub id: i64,
    /// URL-friendly slug
    pub slug: String,
    /// Post title
    pub title: String,
    /// Markdown content
    pub content: String,
    /// Rendered HTML content
    pub content_html: String,
    /// Short plain-text excerpt used in list views
    #[serde(default)]
    pub excerpt: String,
    /// Category ID
    pub category_id: i64,
    /// Publication status
    pub status: PostStatus,
    /// Publication timestamp
    pub published_at: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
    /// View count
    #[serde(default)]
    pub view_count: i64,
    /// Comment count
    #[serde(default)]
    pub comment_count: i64,
    /// Thumbnail image URL
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Whether the post is pinned
    #[serde(default)]
    pub is_pinned: bool,
    /// Pin order (lower = higher priority)
    #[serde(default)]
    pub pin_order: i32,
}

impl Post {
    /// Create a new post with the given parameters
    pub fn new(
        slug: String,
        title: String,
        content: String,
        content_html: String,
        excerpt: String,
        category_id: i64,
        status: PostStatus,
    ) -> Self {
        let now = Utc::now();
        let published_at = if status == PostStatus::Published {
            Some(now)
        } else {
            None
        };

        Self {
            id: 0, // Will be set by database
            slug,
            title,
            content,
            content_html,
            excerpt,
            category_id,
            status,
            published_at,
            created_at: now,
            updated_at: now,
            view_count: 0,
            comment_count: 0,
            thumbnail: None,
            is_pinned: false,
            pin_order: 0,
        }
    }
}

/// Post publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    /// Draft - not visible to public
    #[default]
    Draft,
    /// Published - visible to public
    Published,
    /// Archived - hidden but not deleted
    Archived,
}

impl PostStatus {
    /// Convert status to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
            PostStatus::Archived => "archived",
        }
    }

    /// Parse status from database string representation
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(PostStatus::Draft),
            "published" => Some(PostStatus::Published),
            "archived" => Some(PostStatus::Archived),
            _ => None,
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for creating a new post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePostInput {
    /// URL-friendly slug (generated from title when absent)
    pub slug: Option<String>,
    /// Post title
    pub title: String,
    /// Markdown content
    pub content: String,
    /// Short excerpt (derived from content when absent)
    pub excerpt: Option<String>,
    /// Category ID (defaults to the default category)
    pub category_id: Option<i64>,
    /// Publication status (defaults to Draft)
    pub status: Option<PostStatus>,
    /// Thumbnail image URL
    pub thumbnail: Option<String>,
    /// Tag names to attach
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Input for updating an existing post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePostInput {
    /// New slug (optional)
    pub slug: Option<String>,
    /// New title (optional)
    pub title: Option<String>,
    /// New markdown content (optional)
    pub content: Option<String>,
    /// New excerpt (optional)
    pub excerpt: Option<String>,
    /// New category ID (optional)
    pub category_id: Option<i64>,
    /// New status (optional)
    pub status: Option<PostStatus>,
    /// New thumbnail URL (optional)
    pub thumbnail: Option<String>,
    /// Whether the post is pinned (optional)
    pub is_pinned: Option<bool>,
    /// Pin order (optional)
    pub pin_order: Option<i32>,
    /// Replacement tag list (optional; replaces all associations)
    pub tags: Option<Vec<String>>,
}

impl UpdatePostInput {
    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.slug.is_some()
            || self.title.is_some()
            || self.content.is_some()
            || self.excerpt.is_some()
            || self.category_id.is_some()
            || self.status.is_some()
            || self.thumbnail.is_some()
            || self.is_pinned.is_some()
            || self.pin_order.is_some()
            || self.tags.is_some()
    }
}

/// Filter for post list queries
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    /// Only posts with this status
    pub status: Option<PostStatus>,
    /// Only posts in this category
    pub category_id: Option<i64>,
    /// Only posts carrying this tag
    pub tag_id: Option<i64>,
    /// Title/content search term
    pub search: Option<String>,
}

impl PostFilter {
    /// Filter matching published posts only (the public listing)
    pub fn published() -> Self {
        Self {
            status: Some(PostStatus::Published),
            ..Self::default()
        }
    }
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        ((self.page.saturating_sub(1)) * self.per_page) as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 {
            return 0;
        }
        ((self.total as u32) + self.per_page - 1) / self.per_page
    }

    /// Check if there is a next page
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Check if there is a previous page
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Check if the result is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the number of items in the current page
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Map items into another type, keeping the pagination envelope
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            per_page: 10,
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Offsets never go negative and always land on a page boundary.
        #[test]
        fn list_params_offset_is_consistent(page in 1u32..10_000, per_page in 1u32..=100) {
            let params = ListParams::new(page, per_page);
            prop_assert_eq!(params.offset(), ((page - 1) * per_page) as i64);
            prop_assert!(params.offset() >= 0);
        }

        /// total_pages is the smallest page count that covers the total.
        #[test]
        fn paged_result_pages_cover_total(total in 0i64..100_000, per_page in 1u32..=100) {
            let params = ListParams::new(1, per_page);
            let result: PagedResult<i32> = PagedResult::new(vec![], total, &params);
            let pages = result.total_pages() as i64;
            prop_assert!(pages * per_page as i64 >= total);
            prop_assert!((pages - 1) * per_page as i64 <= total.max(0));
        }
    }
}
