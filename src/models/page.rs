//! Page model for standalone pages (about, contact, ...)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Page publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    #[default]
    Draft,
    Published,
}

impl PageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageStatus::Draft => "draft",
            PageStatus::Published => "published",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(PageStatus::Draft),
            "published" => Some(PageStatus::Published),
            _ => None,
        }
    }
}

impl std::fmt::Display for PageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Page entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: i64,
    pub slug: String,
    pub title: String,
    /// Markdown content
    pub content: String,
    /// Rendered HTML content
    pub content_html: String,
    pub status: PageStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    pub fn new(slug: String, title: String, content: String, content_html: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            slug,
            title,
            content,
            content_html,
            status: PageStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating a page
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePageInput {
    pub slug: Option<String>,
    pub title: String,
    pub content: String,
    pub status: Option<PageStatus>,
}

/// Input for updating a page
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePageInput {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<PageStatus>,
}
