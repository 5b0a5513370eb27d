//! Widget service
//!
//! Business logic for layout widgets: CRUD, ordering, and the resolution
//! step that turns a widget row into renderable data (recent posts, tag
//! cloud, category list, or raw HTML) for the public templates.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{CategoryRepository, PostRepository, TagRepository, WidgetRepository};
use crate::models::{
    CreateWidgetInput, ListParams, PostFilter, ResolvedWidget, UpdateWidgetInput,
    UpdateWidgetOrderInput, Widget, WidgetArea, WidgetKind,
};
use anyhow::{Context, Result};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const RESOLVE_CACHE_TTL: Duration = Duration::from_secs(120);

/// Default item count for recent_posts widgets
const DEFAULT_RECENT_COUNT: u32 = 5;

/// Default tag count for tag_cloud widgets
const DEFAULT_CLOUD_LIMIT: usize = 20;

/// Error types for widget service operations
#[derive(Debug, thiserror::Error)]
pub enum WidgetServiceError {
    /// Widget not found
    #[error("Widget not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Widget service
pub struct WidgetService {
    repo: Arc<dyn WidgetRepository>,
    post_repo: Arc<dyn PostRepository>,
    tag_repo: Arc<dyn TagRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    cache: Arc<Cache>,
}

impl WidgetService {
    /// Create a new widget service
    pub fn new(
        repo: Arc<dyn WidgetRepository>,
        post_repo: Arc<dyn PostRepository>,
        tag_repo: Arc<dyn TagRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            repo,
            post_repo,
            tag_repo,
            category_repo,
            cache,
        }
    }

    /// Create a widget
    pub async fn create(&self, input: CreateWidgetInput) -> Result<Widget, WidgetServiceError> {
        let area = WidgetArea::from_str(&input.area)
            .map_err(|e| WidgetServiceError::ValidationError(e.to_string()))?;
        let kind = WidgetKind::from_str(&input.kind)
            .map_err(|e| WidgetServiceError::ValidationError(e.to_string()))?;
        validate_config(kind, &input.config)?;

        let mut widget = Widget::new(area, kind, input.title.trim().to_string());
        widget.config = input.config;
        widget.sort_order = input.sort_order;
        widget.visible = input.visible;

        let created = self
            .repo
            .create(&widget)
            .await
            .context("Failed to create widget")?;

        self.invalidate_cache().await;
        Ok(created)
    }

    /// Update a widget
    pub async fn update(
        &self,
        id: i64,
        input: UpdateWidgetInput,
    ) -> Result<Widget, WidgetServiceError> {
        let mut widget = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get widget")?
            .ok_or_else(|| WidgetServiceError::NotFound(format!("Widget {} not found", id)))?;

        if let Some(area) = input.area {
            widget.area = WidgetArea::from_str(&area)
                .map_err(|e| WidgetServiceError::ValidationError(e.to_string()))?;
        }
        if let Some(kind) = input.kind {
            widget.kind = WidgetKind::from_str(&kind)
                .map_err(|e| WidgetServiceError::ValidationError(e.to_string()))?;
        }
        if let Some(title) = input.title {
            widget.title = title.trim().to_string();
        }
        if let Some(config) = input.config {
            widget.config = config;
        }
        validate_config(widget.kind, &widget.config)?;

        if let Some(sort_order) = input.sort_order {
            widget.sort_order = sort_order;
        }
        if let Some(visible) = input.visible {
            widget.visible = visible;
        }

        self.repo
            .update(&widget)
            .await
            .context("Failed to update widget")?;

        self.invalidate_cache().await;
        Ok(widget)
    }

    /// Delete a widget
    pub async fn delete(&self, id: i64) -> Result<(), WidgetServiceError> {
        let deleted = self
            .repo
            .delete(id)
            .await
            .context("Failed to delete widget")?;
        if !deleted {
            return Err(WidgetServiceError::NotFound(format!(
                "Widget {} not found",
                id
            )));
        }

        self.invalidate_cache().await;
        Ok(())
    }

    /// Get a widget by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Widget>, WidgetServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get widget")
            .map_err(Into::into)
    }

    /// List all widgets (the admin view)
    pub async fn list(&self) -> Result<Vec<Widget>, WidgetServiceError> {
        self.repo
            .list()
            .await
            .context("Failed to list widgets")
            .map_err(Into::into)
    }

    /// Apply a batch reorder
    pub async fn reorder(&self, input: UpdateWidgetOrderInput) -> Result<(), WidgetServiceError> {
        self.repo
            .reorder(&input.items)
            .await
            .context("Failed to reorder widgets")?;

        self.invalidate_cache().await;
        Ok(())
    }

    /// Resolve the visible widgets of an area into renderable data
    ///
    /// Resolution runs each widget's kind against the live content and is
    /// cached briefly; content mutations invalidate it.
    pub async fn resolve_area(
        &self,
        area: WidgetArea,
    ) -> Result<Vec<ResolvedWidget>, WidgetServiceError> {
        let cache_key = format!("widgets:area:{}", area);
        if let Ok(Some(cached)) = self.cache.get::<Vec<ResolvedWidget>>(&cache_key).await {
            return Ok(cached);
        }

        let widgets = self
            .repo
            .list_by_area(area)
            .await
            .context("Failed to list widgets")?;

        let mut resolved = Vec::new();
        for widget in widgets.into_iter().filter(|w| w.visible) {
            match self.resolve_widget(&widget).await {
                Ok(data) => resolved.push(ResolvedWidget {
                    id: widget.id,
                    kind: widget.kind,
                    title: widget.title,
                    data,
                }),
                Err(e) => {
                    // One broken widget must not take the page down
                    tracing::warn!("Failed to resolve widget {}: {}", widget.id, e);
                }
            }
        }

        let _ = self.cache.set(&cache_key, &resolved, RESOLVE_CACHE_TTL).await;
        Ok(resolved)
    }

    async fn resolve_widget(&self, widget: &Widget) -> Result<serde_json::Value> {
        match widget.kind {
            WidgetKind::Html => Ok(serde_json::json!({
                "html": widget.config.get("html").and_then(|v| v.as_str()).unwrap_or(""),
            })),
            WidgetKind::RecentPosts => {
                let count = widget
                    .config
                    .get("count")
                    .and_then(|v| v.as_u64())
                    .map(|c| c as u32)
                    .unwrap_or(DEFAULT_RECENT_COUNT);
                let posts = self
                    .post_repo
                    .list(&PostFilter::published(), &ListParams::new(1, count))
                    .await?;
                let items: Vec<serde_json::Value> = posts
                    .items
                    .iter()
                    .map(|p| {
                        serde_json::json!({
                            "title": p.title,
                            "slug": p.slug,
                            "published_at": p.published_at.map(|dt| dt.to_rfc3339()),
                        })
                    })
                    .collect();
                Ok(serde_json::json!({ "posts": items }))
            }
            WidgetKind::TagCloud => {
                let limit = widget
                    .config
                    .get("limit")
                    .and_then(|v| v.as_u64())
                    .map(|l| l as usize)
                    .unwrap_or(DEFAULT_CLOUD_LIMIT);
                let tags = self.tag_repo.get_with_counts(limit).await?;
                let items: Vec<serde_json::Value> = tags
                    .iter()
                    .map(|t| {
                        serde_json::json!({
                            "name": t.tag.name,
                            "slug": t.tag.slug,
                            "count": t.post_count,
                        })
                    })
                    .collect();
                Ok(serde_json::json!({ "tags": items }))
            }
            WidgetKind::CategoryList => {
                let categories = self.category_repo.list_with_counts().await?;
                let items: Vec<serde_json::Value> = categories
                    .iter()
                    .map(|(c, count)| {
                        serde_json::json!({
                            "name": c.name,
                            "slug": c.slug,
                            "count": count,
                        })
                    })
                    .collect();
                Ok(serde_json::json!({ "categories": items }))
            }
        }
    }

    async fn invalidate_cache(&self) {
        let _ = self.cache.delete_pattern("widgets:*").await;
    }
}

/// Validate kind-specific config shapes
fn validate_config(
    kind: WidgetKind,
    config: &serde_json::Value,
) -> Result<(), WidgetServiceError> {
    if !config.is_object() {
        return Err(WidgetServiceError::ValidationError(
            "Widget config must be a JSON object".to_string(),
        ));
    }

    match kind {
        WidgetKind::Html => {
            if config.get("html").map(|v| !v.is_string()).unwrap_or(false) {
                return Err(WidgetServiceError::ValidationError(
                    "html widgets need a string 'html' field".to_string(),
                ));
            }
        }
        WidgetKind::RecentPosts => {
            if let Some(count) = config.get("count") {
                match count.as_u64() {
                    Some(c) if (1..=50).contains(&c) => {}
                    _ => {
                        return Err(WidgetServiceError::ValidationError(
                            "recent_posts 'count' must be between 1 and 50".to_string(),
                        ))
                    }
                }
            }
        }
        WidgetKind::TagCloud => {
            if let Some(limit) = config.get("limit") {
                match limit.as_u64() {
                    Some(l) if (1..=200).contains(&l) => {}
                    _ => {
                        return Err(WidgetServiceError::ValidationError(
                            "tag_cloud 'limit' must be between 1 and 200".to_string(),
                        ))
                    }
                }
            }
        }
        WidgetKind::CategoryList => {}
    }

    Ok(())
}
