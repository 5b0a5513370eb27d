//! Widget model
//!
//! Widgets are blocks the public theme renders into a named area. Each
//! widget has a kind that decides how its `config` JSON is interpreted
//! when the rendering path resolves it into template data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Area of the public layout a widget renders into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WidgetArea {
    #[default]
    Sidebar,
    Footer,
}

impl std::fmt::Display for WidgetArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sidebar => write!(f, "sidebar"),
            Self::Footer => write!(f, "footer"),
        }
    }
}

impl std::str::FromStr for WidgetArea {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sidebar" => Ok(Self::Sidebar),
            "footer" => Ok(Self::Footer),
            _ => Err(anyhow::anyhow!("Invalid widget area: {}", s)),
        }
    }
}

/// What a widget renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    /// Raw HTML from `config.html`
    Html,
    /// The latest published posts; `config.count` bounds the list
    RecentPosts,
    /// Tag cloud; `config.limit` bounds the cloud
    TagCloud,
    /// Flat category list
    CategoryList,
}

impl std::fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Html => write!(f, "html"),
            Self::RecentPosts => write!(f, "recent_posts"),
            Self::TagCloud => write!(f, "tag_cloud"),
            Self::CategoryList => write!(f, "category_list"),
        }
    }
}

impl std::str::FromStr for WidgetKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "recent_posts" => Ok(Self::RecentPosts),
            "tag_cloud" => Ok(Self::TagCloud),
            "category_list" => Ok(Self::CategoryList),
            _ => Err(anyhow::anyhow!("Invalid widget kind: {}", s)),
        }
    }
}

/// Widget entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Widget {
    pub id: i64,
    pub area: WidgetArea,
    pub kind: WidgetKind,
    pub title: String,
    /// Kind-specific configuration (JSON object)
    pub config: serde_json::Value,
    pub sort_order: i32,
    pub visible: bool,
    pub created_at: DateTime<Utc>,
}

impl Widget {
    pub fn new(area: WidgetArea, kind: WidgetKind, title: String) -> Self {
        Self {
            id: 0,
            area,
            kind,
            title,
            config: serde_json::json!({}),
            sort_order: 0,
            visible: true,
            created_at: Utc::now(),
        }
    }
}

/// A widget resolved for rendering: the entity plus the data its kind
/// produced (recent posts, tag cloud, ...) ready for the templates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedWidget {
    pub id: i64,
    pub kind: WidgetKind,
    pub title: String,
    pub data: serde_json::Value,
}

/// Input for creating a widget
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWidgetInput {
    pub area: String,
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_config")]
    pub config: serde_json::Value,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_config() -> serde_json::Value {
    serde_json::json!({})
}

fn default_visible() -> bool {
    true
}

/// Input for updating a widget
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateWidgetInput {
    pub area: Option<String>,
    pub kind: Option<String>,
    pub title: Option<String>,
    pub config: Option<serde_json::Value>,
    pub sort_order: Option<i32>,
    pub visible: Option<bool>,
}

/// Input for batch updating widget order
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateWidgetOrderInput {
    pub items: Vec<WidgetOrderItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WidgetOrderItem {
    pub id: i64,
    pub sort_order: i32,
}
