//! Category service
//!
//! Business logic for the category hierarchy: CRUD, the tree view, and
//! the reassignment of posts when a category goes away.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::CategoryRepository;
use crate::models::{
    Category, CategoryTree, CreateCategoryInput, UpdateCategoryInput, DEFAULT_CATEGORY_ID,
};
use crate::services::slug::generate_slug;
use anyhow::Context;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const TREE_CACHE_KEY: &str = "categories:tree";
const TREE_CACHE_TTL: Duration = Duration::from_secs(300);

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    /// Category not found
    #[error("Category not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Category service for organizing posts
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    cache: Arc<Cache>,
}

impl CategoryService {
    /// Create a new category service
    pub fn new(repo: Arc<dyn CategoryRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    /// Create a new category
    ///
    /// The slug is taken from the input or generated from the name. A
    /// duplicate slug is rejected (categories are few; silently renaming
    /// them would be surprising).
    pub async fn create(
        &self,
        input: CreateCategoryInput,
    ) -> Result<Category, CategoryServiceError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(CategoryServiceError::ValidationError(
                "Category name cannot be empty".to_string(),
            ));
        }

        let slug = match input.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => generate_slug(slug),
            _ => generate_slug(name),
        };
        if slug.is_empty() {
            return Err(CategoryServiceError::ValidationError(
                "Category name produces an empty slug".to_string(),
            ));
        }

        if self
            .repo
            .slug_exists(&slug, None)
            .await
            .context("Failed to check category slug")?
        {
            return Err(CategoryServiceError::ValidationError(format!(
                "Category slug '{}' already exists",
                slug
            )));
        }

        if let Some(parent_id) = input.parent_id {
            self.require_exists(parent_id).await?;
        }

        let mut category = Category::new(slug, name.to_string());
        category.description = input.description;
        category.parent_id = input.parent_id;
        category.sort_order = input.sort_order;

        let created = self
            .repo
            .create(&category)
            .await
            .context("Failed to create category")?;

        self.invalidate_cache().await;
        Ok(created)
    }

    /// Update an existing category
    pub async fn update(
        &self,
        id: i64,
        input: UpdateCategoryInput,
    ) -> Result<Category, CategoryServiceError> {
        let mut category = self.require_exists(id).await?;

        if let Some(name) = input.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(CategoryServiceError::ValidationError(
                    "Category name cannot be empty".to_string(),
                ));
            }
            category.name = name;
        }

        if let Some(slug) = input.slug {
            let slug = generate_slug(slug.trim());
            if slug.is_empty() {
                return Err(CategoryServiceError::ValidationError(
                    "Category slug cannot be empty".to_string(),
                ));
            }
            if slug != category.slug
                && self
                    .repo
                    .slug_exists(&slug, Some(id))
                    .await
                    .context("Failed to check category slug")?
            {
                return Err(CategoryServiceError::ValidationError(format!(
                    "Category slug '{}' already exists",
                    slug
                )));
            }
            category.slug = slug;
        }

        if let Some(description) = input.description {
            category.description = if description.is_empty() {
                None
            } else {
                Some(description)
            };
        }

        if let Some(parent_id) = input.parent_id {
            if let Some(pid) = parent_id {
                if pid == id {
                    return Err(CategoryServiceError::ValidationError(
                        "A category cannot be its own parent".to_string(),
                    ));
                }
                self.require_exists(pid).await?;
            }
            category.parent_id = parent_id;
        }

        if let Some(sort_order) = input.sort_order {
            category.sort_order = sort_order;
        }

        self.repo
            .update(&category)
            .await
            .context("Failed to update category")?;

        self.invalidate_cache().await;
        Ok(category)
    }

    /// Delete a category
    ///
    /// Posts move to the default category; child categories detach to the
    /// root. The default category itself cannot be deleted.
    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        if id == DEFAULT_CATEGORY_ID {
            return Err(CategoryServiceError::ValidationError(
                "The default category cannot be deleted".to_string(),
            ));
        }

        let category = self.require_exists(id).await?;

        let moved = self
            .repo
            .reassign_posts(category.id, DEFAULT_CATEGORY_ID)
            .await
            .context("Failed to reassign posts")?;
        self.repo
            .detach_children(category.id)
            .await
            .context("Failed to detach children")?;
        self.repo
            .delete(category.id)
            .await
            .context("Failed to delete category")?;

        self.invalidate_cache().await;
        tracing::info!(
            "Deleted category '{}' ({} posts moved to default)",
            category.slug,
            moved
        );
        Ok(())
    }

    /// Get category by slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>, CategoryServiceError> {
        self.repo
            .get_by_slug(slug)
            .await
            .context("Failed to get category")
            .map_err(Into::into)
    }

    /// Get category by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Category>, CategoryServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get category")
            .map_err(Into::into)
    }

    /// List all categories, flat
    pub async fn list(&self) -> Result<Vec<Category>, CategoryServiceError> {
        self.repo
            .list()
            .await
            .context("Failed to list categories")
            .map_err(Into::into)
    }

    /// Build the category tree with post counts
    ///
    /// Categories whose parent no longer exists surface at the root.
    pub async fn tree(&self) -> Result<Vec<CategoryTree>, CategoryServiceError> {
        if let Ok(Some(cached)) = self.cache.get::<Vec<CategoryTree>>(TREE_CACHE_KEY).await {
            return Ok(cached);
        }

        let with_counts = self
            .repo
            .list_with_counts()
            .await
            .context("Failed to list categories with counts")?;

        let tree = build_tree(with_counts);
        let _ = self.cache.set(TREE_CACHE_KEY, &tree, TREE_CACHE_TTL).await;
        Ok(tree)
    }

    async fn require_exists(&self, id: i64) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?
            .ok_or_else(|| {
                CategoryServiceError::NotFound(format!("Category with ID {} not found", id))
            })
    }

    async fn invalidate_cache(&self) {
        let _ = self.cache.delete_pattern("categories:*").await;
        let _ = self.cache.delete_pattern("posts:list:*").await;
        let _ = self.cache.delete_pattern("widgets:*").await;
    }
}

/// Assemble a one-level tree from a flat category list
fn build_tree(categories: Vec<(Category, i64)>) -> Vec<CategoryTree> {
    let ids: Vec<i64> = categories.iter().map(|(c, _)| c.id).collect();
    let mut children_of: HashMap<i64, Vec<CategoryTree>> = HashMap::new();
    let mut roots = Vec::new();

    // Children first, preserving the repository ordering
    for (category, count) in &categories {
        if let Some(parent_id) = category.parent_id {
            if ids.contains(&parent_id) && parent_id != category.id {
                children_of
                    .entry(parent_id)
                    .or_default()
                    .push(CategoryTree::new(category.clone(), *count));
                continue;
            }
        }
    }

    for (category, count) in categories {
        let is_child = category
            .parent_id
            .map(|pid| ids.contains(&pid) && pid != category.id)
            .unwrap_or(false);
        if is_child {
            continue;
        }
        let mut node = CategoryTree::new(category, count);
        if let Some(children) = children_of.remove(&node.category.id) {
            node.children = children;
        }
        roots.push(node);
    }

    roots
}
