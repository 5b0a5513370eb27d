//! Tag service
//!
//! Implements business logic for tag management:
//! - Create or reuse tags by name
//! - Tag cloud with usage frequency
//! - Tag-post associations
//! - Duplicate detection over a string-similarity heuristic, and the
//!   merge operation that cleans duplicates up

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::TagRepository;
use crate::models::{Tag, TagDuplicate, TagWithCount};
use crate::services::slug::generate_slug;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

/// Default similarity threshold for duplicate reporting
pub const DEFAULT_DUPLICATE_THRESHOLD: f64 = 0.8;

const CLOUD_CACHE_TTL: Duration = Duration::from_secs(300);

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    /// Tag not found
    #[error("Tag not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Tag service for managing blog tags
pub struct TagService {
    repo: Arc<dyn TagRepository>,
    cache: Arc<Cache>,
}

impl TagService {
    /// Create a new tag service
    pub fn new(repo: Arc<dyn TagRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    /// Create a new tag or get an existing one by name
    ///
    /// If a tag with the given name already exists, returns the existing
    /// tag. Otherwise, creates a new tag with a generated slug.
    pub async fn create_or_get(&self, name: &str) -> Result<Tag, TagServiceError> {
        let trimmed_name = name.trim();
        if trimmed_name.is_empty() {
            return Err(TagServiceError::ValidationError(
                "Tag name cannot be empty".to_string(),
            ));
        }

        if let Some(existing) = self
            .repo
            .get_by_name(trimmed_name)
            .await
            .context("Failed to check existing tag")?
        {
            return Ok(existing);
        }

        let slug = generate_slug(trimmed_name);
        if slug.is_empty() {
            return Err(TagServiceError::ValidationError(format!(
                "Tag name '{}' produces an empty slug",
                trimmed_name
            )));
        }

        // Names that differ only in separators or case collapse to the
        // same slug; reuse the existing tag rather than violating the
        // unique slug constraint.
        if let Some(existing) = self
            .repo
            .get_by_slug(&slug)
            .await
            .context("Failed to check existing tag slug")?
        {
            return Ok(existing);
        }

        let tag = Tag::new(slug, trimmed_name.to_string());
        let created = self
            .repo
            .create(&tag)
            .await
            .context("Failed to create tag")?;

        self.invalidate_cache().await;
        Ok(created)
    }

    /// Get tag by slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>, TagServiceError> {
        self.repo
            .get_by_slug(slug)
            .await
            .context("Failed to get tag by slug")
            .map_err(Into::into)
    }

    /// Get tag by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Tag>, TagServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get tag by ID")
            .map_err(Into::into)
    }

    /// List all tags ordered by name
    pub async fn list(&self) -> Result<Vec<Tag>, TagServiceError> {
        self.repo
            .list()
            .await
            .context("Failed to list tags")
            .map_err(Into::into)
    }

    /// Get the tag cloud (tags with usage count, sorted by frequency)
    pub async fn get_tag_cloud(&self, limit: usize) -> Result<Vec<TagWithCount>, TagServiceError> {
        let cache_key = format!("tags:cloud:{}", limit);
        if let Ok(Some(cached)) = self.cache.get::<Vec<TagWithCount>>(&cache_key).await {
            return Ok(cached);
        }

        let cloud = self
            .repo
            .get_with_counts(limit)
            .await
            .context("Failed to get tag cloud")?;

        let _ = self.cache.set(&cache_key, &cloud, CLOUD_CACHE_TTL).await;
        Ok(cloud)
    }

    /// Delete a tag
    ///
    /// Removes the tag and all its post associations.
    pub async fn delete(&self, id: i64) -> Result<(), TagServiceError> {
        let tag = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get tag")?
            .ok_or_else(|| TagServiceError::NotFound(format!("Tag with ID {} not found", id)))?;

        self.repo
            .delete(tag.id)
            .await
            .context("Failed to delete tag")?;

        self.invalidate_cache().await;
        Ok(())
    }

    /// Add a tag to a post (no-op when the association exists)
    pub async fn add_to_post(&self, tag_id: i64, post_id: i64) -> Result<(), TagServiceError> {
        self.repo
            .add_to_post(tag_id, post_id)
            .await
            .context("Failed to add tag to post")?;
        self.invalidate_cache().await;
        Ok(())
    }

    /// Remove a tag from a post
    pub async fn remove_from_post(&self, tag_id: i64, post_id: i64) -> Result<(), TagServiceError> {
        self.repo
            .remove_from_post(tag_id, post_id)
            .await
            .context("Failed to remove tag from post")?;
        self.invalidate_cache().await;
        Ok(())
    }

    /// Get tags for a post
    pub async fn get_by_post_id(&self, post_id: i64) -> Result<Vec<Tag>, TagServiceError> {
        self.repo
            .get_by_post_id(post_id)
            .await
            .context("Failed to get tags by post")
            .map_err(Into::into)
    }

    /// Find likely duplicate tag pairs.
    ///
    /// Every pair of tags is scored with [`similarity_score`] over their
    /// names; pairs at or above `threshold` are reported, strongest
    /// matches first. Each pair appears once (the tag with the smaller id
    /// on the left), and a tag is never paired with itself.
    pub async fn find_duplicates(
        &self,
        threshold: Option<f64>,
    ) -> Result<Vec<TagDuplicate>, TagServiceError> {
        let threshold = threshold.unwrap_or(DEFAULT_DUPLICATE_THRESHOLD);
        if !(0.0..=1.0).contains(&threshold) {
            return Err(TagServiceError::ValidationError(format!(
                "Threshold must be between 0 and 1, got {}",
                threshold
            )));
        }

        let tags = self
            .repo
            .get_with_counts(0)
            .await
            .context("Failed to load tags for duplicate detection")?;

        let mut duplicates = Vec::new();
        for i in 0..tags.len() {
            for j in (i + 1)..tags.len() {
                let score = similarity_score(&tags[i].tag.name, &tags[j].tag.name);
                if score >= threshold {
                    let (left, right) = if tags[i].tag.id <= tags[j].tag.id {
                        (tags[i].clone(), tags[j].clone())
                    } else {
                        (tags[j].clone(), tags[i].clone())
                    };
                    duplicates.push(TagDuplicate { left, right, score });
                }
            }
        }

        duplicates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.left.tag.id.cmp(&b.left.tag.id))
        });

        Ok(duplicates)
    }

    /// Merge one tag into another.
    ///
    /// All posts tagged with `source_id` are re-tagged with `target_id`
    /// (posts already carrying the target keep a single association), and
    /// the source tag is deleted. Returns the surviving tag.
    pub async fn merge(&self, source_id: i64, target_id: i64) -> Result<Tag, TagServiceError> {
        if source_id == target_id {
            return Err(TagServiceError::ValidationError(
                "Cannot merge a tag into itself".to_string(),
            ));
        }

        let source = self
            .repo
            .get_by_id(source_id)
            .await
            .context("Failed to get source tag")?
            .ok_or_else(|| {
                TagServiceError::NotFound(format!("Source tag {} not found", source_id))
            })?;

        let target = self
            .repo
            .get_by_id(target_id)
            .await
            .context("Failed to get target tag")?
            .ok_or_else(|| {
                TagServiceError::NotFound(format!("Target tag {} not found", target_id))
            })?;

        self.repo
            .reassign_posts(source.id, target.id)
            .await
            .context("Failed to reassign posts during merge")?;

        self.repo
            .delete(source.id)
            .await
            .context("Failed to delete merged tag")?;

        self.invalidate_cache().await;
        tracing::info!("Merged tag '{}' into '{}'", source.name, target.name);
        Ok(target)
    }

    async fn invalidate_cache(&self) {
        let _ = self.cache.delete_pattern("tags:*").await;
        let _ = self.cache.delete_pattern("posts:list:*").await;
        let _ = self.cache.delete_pattern("widgets:*").await;
    }
}

// ============================================================================
// Similarity scoring
// ============================================================================

/// Score the similarity of two tag names in [0.0, 1.0].
///
/// The comparison runs over normalized names (lowercased, separators and
/// punctuation stripped) so "Rust Lang", "rust-lang" and "rustlang" all
/// normalize identically:
///
/// - identical normalized names score 1.0
/// - singular/plural variants ("tag" / "tags", "category" / "categories")
///   score 0.95
/// - containment of one name in the other (at least 3 characters) scores
///   0.85
/// - anything else scores by normalized Levenshtein similarity
pub fn similarity_score(a: &str, b: &str) -> f64 {
    let na = normalize_tag_name(a);
    let nb = normalize_tag_name(b);

    if na.is_empty() || nb.is_empty() {
        return 0.0;
    }
    if na == nb {
        return 1.0;
    }
    if is_plural_variant(&na, &nb) {
        return 0.95;
    }

    let (shorter, longer) = if na.chars().count() <= nb.chars().count() {
        (&na, &nb)
    } else {
        (&nb, &na)
    };
    if shorter.chars().count() >= 3 && longer.contains(shorter.as_str()) {
        return 0.85;
    }

    let distance = levenshtein(&na, &nb);
    let max_len = na.chars().count().max(nb.chars().count());
    1.0 - (distance as f64 / max_len as f64)
}

/// Normalize a tag name for comparison: lowercase and keep only
/// alphanumeric characters.
fn normalize_tag_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Check whether two normalized names are singular/plural variants
fn is_plural_variant(a: &str, b: &str) -> bool {
    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    // tag / tags, box / boxes
    if longer == format!("{}s", shorter) || longer == format!("{}es", shorter) {
        return true;
    }

    // category / categories
    if let Some(stem) = shorter.strip_suffix('y') {
        if longer == format!("{}ies", stem) {
            return true;
        }
    }

    false
}

/// Levenshtein edit distance over characters
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
