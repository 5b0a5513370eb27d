//! Menu item model for site navigation

use serde::{Deserialize, Serialize};

/// Menu item type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MenuItemType {
    /// Built-in destinations (home, archive, categories, tags)
    #[default]
    Builtin,
    /// Standalone page (links to a Page by slug)
    Page,
    /// External URL
    External,
}

impl std::fmt::Display for MenuItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Builtin => write!(f, "builtin"),
            Self::Page => write!(f, "page"),
            Self::External => write!(f, "external"),
        }
    }
}

impl std::str::FromStr for MenuItemType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "builtin" => Ok(Self::Builtin),
            "page" => Ok(Self::Page),
            "external" => Ok(Self::External),
            _ => Err(anyhow::anyhow!("Invalid menu item type: {}", s)),
        }
    }
}

/// Menu item model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub title: String,
    pub item_type: MenuItemType,
    /// For builtin: "home", "archive", "categories", "tags"
    /// For page: page slug
    /// For external: full URL
    pub target: String,
    pub open_new_tab: bool,
    pub sort_order: i32,
    pub visible: bool,
}

impl MenuItem {
    pub fn new(title: String, item_type: MenuItemType, target: String) -> Self {
        Self {
            id: 0,
            parent_id: None,
            title,
            item_type,
            target,
            open_new_tab: false,
            sort_order: 0,
            visible: true,
        }
    }
}

/// Menu item with children (tree structure)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuTree {
    #[serde(flatten)]
    pub item: MenuItem,
    pub children: Vec<MenuTree>,
}

impl MenuTree {
    pub fn new(item: MenuItem) -> Self {
        Self {
            item,
            children: Vec::new(),
        }
    }
}

/// Input for creating a menu item
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMenuItemInput {
    pub parent_id: Option<i64>,
    pub title: String,
    pub item_type: String,
    pub target: String,
    #[serde(default)]
    pub open_new_tab: bool,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

/// Input for updating a menu item
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMenuItemInput {
    pub parent_id: Option<Option<i64>>,
    pub title: Option<String>,
    pub item_type: Option<String>,
    pub target: Option<String>,
    pub open_new_tab: Option<bool>,
    pub sort_order: Option<i32>,
    pub visible: Option<bool>,
}

/// Input for batch updating menu order
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMenuOrderInput {
    pub items: Vec<MenuOrderItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MenuOrderItem {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub sort_order: i32,
}
