//! Category model
//!
//! Categories organize posts into a shallow hierarchy. A seeded default
//! category ("uncategorized", id 1) always exists and absorbs posts whose
//! category is deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The id of the seeded default category
pub const DEFAULT_CATEGORY_ID: i64 = 1;

/// Category entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier
    pub id: i64,
    /// URL-friendly slug
    pub slug: String,
    /// Display name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Parent category (one level of nesting)
    pub parent_id: Option<i64>,
    /// Sort order within siblings
    pub sort_order: i32,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Create a new category
    pub fn new(slug: String, name: String) -> Self {
        Self {
            id: 0,
            slug,
            name,
            description: None,
            parent_id: None,
            sort_order: 0,
            created_at: Utc::now(),
        }
    }
}

/// Category with children (tree structure)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTree {
    #[serde(flatten)]
    pub category: Category,
    /// Number of posts in the category
    pub post_count: i64,
    pub children: Vec<CategoryTree>,
}

impl CategoryTree {
    pub fn new(category: Category, post_count: i64) -> Self {
        Self {
            category,
            post_count,
            children: Vec::new(),
        }
    }
}

/// Input for creating a category
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCategoryInput {
    /// URL-friendly slug (generated from name when absent)
    pub slug: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub sort_order: i32,
}

/// Input for updating a category
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCategoryInput {
    pub slug: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<Option<i64>>,
    pub sort_order: Option<i32>,
}
