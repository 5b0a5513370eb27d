//! Tag model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    /// Unique identifier
    pub id: i64,
    /// URL-friendly slug
    pub slug: String,
    /// Display name
    pub name: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Tag {
    /// Create a new tag
    pub fn new(slug: String, name: String) -> Self {
        Self {
            id: 0,
            slug,
            name,
            created_at: Utc::now(),
        }
    }
}

/// Tag with its post count, used for the tag cloud and duplicate reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagWithCount {
    #[serde(flatten)]
    pub tag: Tag,
    pub post_count: i64,
}

impl TagWithCount {
    pub fn new(tag: Tag, post_count: i64) -> Self {
        Self { tag, post_count }
    }
}

/// A pair of tags flagged as likely duplicates, with the similarity score
/// that flagged them
#[derive(Debug, Clone, Serialize)]
pub struct TagDuplicate {
    pub left: TagWithCount,
    pub right: TagWithCount,
    /// Similarity in [0.0, 1.0]
    pub score: f64,
}
