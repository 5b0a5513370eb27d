//! Menu service
//!
//! Business logic for site navigation: CRUD with target validation, the
//! nested tree, batch reordering, and first-run default seeding.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{MenuRepository, PageRepository};
use crate::models::{
    CreateMenuItemInput, MenuItem, MenuItemType, MenuTree, UpdateMenuItemInput,
    UpdateMenuOrderInput,
};
use anyhow::Context;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const TREE_CACHE_TTL: Duration = Duration::from_secs(300);

/// Builtin navigation targets the public site knows how to route
const BUILTIN_TARGETS: &[&str] = &["home", "archive", "categories", "tags"];

/// Error types for menu service operations
#[derive(Debug, thiserror::Error)]
pub enum MenuServiceError {
    /// Menu item not found
    #[error("Menu item not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Menu service for site navigation
pub struct MenuService {
    repo: Arc<dyn MenuRepository>,
    page_repo: Arc<dyn PageRepository>,
    cache: Arc<Cache>,
}

impl MenuService {
    /// Create a new menu service
    pub fn new(
        repo: Arc<dyn MenuRepository>,
        page_repo: Arc<dyn PageRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            repo,
            page_repo,
            cache,
        }
    }

    /// Seed the default navigation on first run
    ///
    /// Does nothing when any menu item already exists.
    pub async fn init_defaults(&self) -> Result<(), MenuServiceError> {
        let existing = self
            .repo
            .count_all()
            .await
            .context("Failed to count menu items")?;
        if existing > 0 {
            return Ok(());
        }

        let defaults = [
            ("Home", "home"),
            ("Archive", "archive"),
            ("Categories", "categories"),
            ("Tags", "tags"),
        ];

        for (i, (title, target)) in defaults.iter().enumerate() {
            let mut item = MenuItem::new(
                title.to_string(),
                MenuItemType::Builtin,
                target.to_string(),
            );
            item.sort_order = i as i32;
            self.repo
                .create(&item)
                .await
                .context("Failed to seed menu item")?;
        }

        self.invalidate_cache().await;
        tracing::info!("Seeded default navigation");
        Ok(())
    }

    /// Create a menu item
    pub async fn create(&self, input: CreateMenuItemInput) -> Result<MenuItem, MenuServiceError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(MenuServiceError::ValidationError(
                "Title cannot be empty".to_string(),
            ));
        }

        let item_type = MenuItemType::from_str(&input.item_type)
            .map_err(|e| MenuServiceError::ValidationError(e.to_string()))?;
        self.validate_target(item_type, input.target.trim()).await?;

        if let Some(parent_id) = input.parent_id {
            self.require_exists(parent_id).await?;
        }

        let mut item = MenuItem::new(title.to_string(), item_type, input.target.trim().to_string());
        item.parent_id = input.parent_id;
        item.open_new_tab = input.open_new_tab;
        item.sort_order = input.sort_order;
        item.visible = input.visible;

        let created = self
            .repo
            .create(&item)
            .await
            .context("Failed to create menu item")?;

        self.invalidate_cache().await;
        Ok(created)
    }

    /// Update a menu item
    pub async fn update(
        &self,
        id: i64,
        input: UpdateMenuItemInput,
    ) -> Result<MenuItem, MenuServiceError> {
        let mut item = self.require_exists(id).await?;

        if let Some(title) = input.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(MenuServiceError::ValidationError(
                    "Title cannot be empty".to_string(),
                ));
            }
            item.title = title;
        }

        if let Some(item_type) = input.item_type {
            item.item_type = MenuItemType::from_str(&item_type)
                .map_err(|e| MenuServiceError::ValidationError(e.to_string()))?;
        }

        if let Some(target) = input.target {
            item.target = target.trim().to_string();
        }

        // Type or target changes re-validate the pair
        self.validate_target(item.item_type, &item.target).await?;

        if let Some(parent_id) = input.parent_id {
            if let Some(pid) = parent_id {
                if pid == id {
                    return Err(MenuServiceError::ValidationError(
                        "A menu item cannot be its own parent".to_string(),
                    ));
                }
                self.require_exists(pid).await?;
            }
            item.parent_id = parent_id;
        }

        if let Some(open_new_tab) = input.open_new_tab {
            item.open_new_tab = open_new_tab;
        }
        if let Some(sort_order) = input.sort_order {
            item.sort_order = sort_order;
        }
        if let Some(visible) = input.visible {
            item.visible = visible;
        }

        self.repo
            .update(&item)
            .await
            .context("Failed to update menu item")?;

        self.invalidate_cache().await;
        Ok(item)
    }

    /// Delete a menu item (children cascade)
    pub async fn delete(&self, id: i64) -> Result<(), MenuServiceError> {
        let deleted = self
            .repo
            .delete(id)
            .await
            .context("Failed to delete menu item")?;
        if !deleted {
            return Err(MenuServiceError::NotFound(format!(
                "Menu item {} not found",
                id
            )));
        }

        self.invalidate_cache().await;
        Ok(())
    }

    /// Get a menu item by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<MenuItem>, MenuServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get menu item")
            .map_err(Into::into)
    }

    /// List all menu items, flat (the admin view)
    pub async fn list(&self) -> Result<Vec<MenuItem>, MenuServiceError> {
        self.repo
            .list()
            .await
            .context("Failed to list menu items")
            .map_err(Into::into)
    }

    /// Build the menu tree
    ///
    /// With `visible_only` (the public path) hidden items and their
    /// children disappear. The public tree is cached.
    pub async fn tree(&self, visible_only: bool) -> Result<Vec<MenuTree>, MenuServiceError> {
        let cache_key = format!("menus:tree:{}", visible_only);
        if visible_only {
            if let Ok(Some(cached)) = self.cache.get::<Vec<MenuTree>>(&cache_key).await {
                return Ok(cached);
            }
        }

        let items = self
            .repo
            .list()
            .await
            .context("Failed to list menu items")?;

        let tree = build_tree(items, visible_only);

        if visible_only {
            let _ = self.cache.set(&cache_key, &tree, TREE_CACHE_TTL).await;
        }
        Ok(tree)
    }

    /// Apply a batch reorder
    pub async fn reorder(&self, input: UpdateMenuOrderInput) -> Result<(), MenuServiceError> {
        for item in &input.items {
            if let Some(parent_id) = item.parent_id {
                if parent_id == item.id {
                    return Err(MenuServiceError::ValidationError(
                        "A menu item cannot be its own parent".to_string(),
                    ));
                }
            }
        }

        self.repo
            .reorder(&input.items)
            .await
            .context("Failed to reorder menu items")?;

        self.invalidate_cache().await;
        Ok(())
    }

    async fn require_exists(&self, id: i64) -> Result<MenuItem, MenuServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get menu item")?
            .ok_or_else(|| MenuServiceError::NotFound(format!("Menu item {} not found", id)))
    }

    /// Validate a (type, target) pair
    async fn validate_target(
        &self,
        item_type: MenuItemType,
        target: &str,
    ) -> Result<(), MenuServiceError> {
        if target.is_empty() {
            return Err(MenuServiceError::ValidationError(
                "Target cannot be empty".to_string(),
            ));
        }

        match item_type {
            MenuItemType::Builtin => {
                if !BUILTIN_TARGETS.contains(&target) {
                    return Err(MenuServiceError::ValidationError(format!(
                        "Unknown builtin target '{}'. Known targets: {}",
                        target,
                        BUILTIN_TARGETS.join(", ")
                    )));
                }
            }
            MenuItemType::External => {
                if !target.starts_with("http://") && !target.starts_with("https://") {
                    return Err(MenuServiceError::ValidationError(
                        "External targets must be absolute http(s) URLs".to_string(),
                    ));
                }
            }
            MenuItemType::Page => {
                let exists = self
                    .page_repo
                    .get_by_slug(target)
                    .await
                    .context("Failed to check page")?
                    .is_some();
                if !exists {
                    return Err(MenuServiceError::ValidationError(format!(
                        "No page with slug '{}'",
                        target
                    )));
                }
            }
        }

        Ok(())
    }

    async fn invalidate_cache(&self) {
        let _ = self.cache.delete_pattern("menus:*").await;
    }
}

/// Assemble the menu tree from a flat, sort-ordered list
fn build_tree(items: Vec<MenuItem>, visible_only: bool) -> Vec<MenuTree> {
    let items: Vec<MenuItem> = if visible_only {
        items.into_iter().filter(|i| i.visible).collect()
    } else {
        items
    };

    let ids: Vec<i64> = items.iter().map(|i| i.id).collect();
    let mut children_of: HashMap<i64, Vec<MenuTree>> = HashMap::new();
    let mut roots = Vec::new();

    for item in &items {
        if let Some(parent_id) = item.parent_id {
            if ids.contains(&parent_id) && parent_id != item.id {
                children_of
                    .entry(parent_id)
                    .or_default()
                    .push(MenuTree::new(item.clone()));
                continue;
            }
        }
    }

    for item in items {
        let is_child = item
            .parent_id
            .map(|pid| ids.contains(&pid) && pid != item.id)
            .unwrap_or(false);
        if is_child {
            continue;
        }
        let mut node = MenuTree::new(item);
        if let Some(children) = children_of.remove(&node.item.id) {
            node.children = children;
        }
        roots.push(node);
    }

    roots
}
