//! Comment service
//!
//! Business logic for guest comments: validation, gravatar-style avatar
//! hashing, single-level threading, and the denormalized per-post
//! counter.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{Comment, CommentThread, CreateCommentInput};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

/// Maximum accepted comment length in characters
const MAX_COMMENT_CHARS: usize = 10_000;

/// Error types for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    /// Comment or post not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Comment service
pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    post_repo: Arc<dyn PostRepository>,
    cache: Arc<Cache>,
}

impl CommentService {
    /// Create a new comment service
    pub fn new(
        repo: Arc<dyn CommentRepository>,
        post_repo: Arc<dyn PostRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            repo,
            post_repo,
            cache,
        }
    }

    /// Create a comment
    ///
    /// Author name and content are required; the email, when present,
    /// only survives as its MD5 hash on the public surface. A reply must
    /// reference a top-level comment on the same post.
    pub async fn create(
        &self,
        input: CreateCommentInput,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<Comment, CommentServiceError> {
        let author_name = input.author_name.trim();
        if author_name.is_empty() {
            return Err(CommentServiceError::ValidationError(
                "Name is required".to_string(),
            ));
        }

        let content = input.content.trim();
        if content.is_empty() {
            return Err(CommentServiceError::ValidationError(
                "Content is required".to_string(),
            ));
        }
        if content.chars().count() > MAX_COMMENT_CHARS {
            return Err(CommentServiceError::ValidationError(format!(
                "Comment exceeds {} characters",
                MAX_COMMENT_CHARS
            )));
        }

        let post = self
            .post_repo
            .get_by_id(input.post_id)
            .await
            .context("Failed to load post")?
            .ok_or_else(|| {
                CommentServiceError::NotFound(format!("Post {} not found", input.post_id))
            })?;

        if let Some(parent_id) = input.parent_id {
            let parent = self
                .repo
                .get_by_id(parent_id)
                .await
                .context("Failed to load parent comment")?
                .ok_or_else(|| {
                    CommentServiceError::NotFound(format!("Parent comment {} not found", parent_id))
                })?;
            if parent.post_id != post.id {
                return Err(CommentServiceError::ValidationError(
                    "Parent comment belongs to a different post".to_string(),
                ));
            }
            // One level of threading only
            if parent.parent_id.is_some() {
                return Err(CommentServiceError::ValidationError(
                    "Replies to replies are not supported".to_string(),
                ));
            }
        }

        let email = input
            .author_email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string);
        let avatar_hash = email.as_deref().map(gravatar_hash);

        let comment = Comment {
            id: 0,
            post_id: post.id,
            parent_id: input.parent_id,
            author_name: author_name.to_string(),
            author_email: email,
            avatar_hash,
            content: content.to_string(),
            ip_address,
            user_agent,
            created_at: Utc::now(),
        };

        let created = self
            .repo
            .create(&comment)
            .await
            .context("Failed to create comment")?;

        self.repo
            .refresh_post_comment_count(post.id)
            .await
            .context("Failed to refresh comment count")?;

        self.invalidate_cache(&post.slug).await;
        Ok(created)
    }

    /// Get the comments of a post as threads (top-level with replies,
    /// oldest first)
    pub async fn get_threads(&self, post_id: i64) -> Result<Vec<CommentThread>, CommentServiceError> {
        let comments = self
            .repo
            .get_by_post_id(post_id)
            .await
            .context("Failed to load comments")?;

        Ok(build_threads(comments))
    }

    /// List the most recent comments across all posts (admin overview)
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<Comment>, CommentServiceError> {
        self.repo
            .list_recent(limit.clamp(1, 100))
            .await
            .context("Failed to list recent comments")
            .map_err(Into::into)
    }

    /// Delete a comment (replies cascade)
    pub async fn delete(&self, id: i64) -> Result<(), CommentServiceError> {
        let comment = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to load comment")?
            .ok_or_else(|| CommentServiceError::NotFound(format!("Comment {} not found", id)))?;

        self.repo
            .delete(comment.id)
            .await
            .context("Failed to delete comment")?;

        self.repo
            .refresh_post_comment_count(comment.post_id)
            .await
            .context("Failed to refresh comment count")?;

        if let Ok(Some(post)) = self.post_repo.get_by_id(comment.post_id).await {
            self.invalidate_cache(&post.slug).await;
        }
        Ok(())
    }

    /// Count all comments
    pub async fn count_all(&self) -> Result<i64, CommentServiceError> {
        self.repo
            .count_all()
            .await
            .context("Failed to count comments")
            .map_err(Into::into)
    }

    async fn invalidate_cache(&self, post_slug: &str) {
        let _ = self
            .cache
            .delete(&format!("posts:slug:{}", post_slug))
            .await;
        let _ = self.cache.delete_pattern("posts:list:*").await;
    }
}

/// MD5 hex digest of the lowercased trimmed email, as gravatar expects
pub fn gravatar_hash(email: &str) -> String {
    format!("{:x}", md5::compute(email.trim().to_lowercase()))
}

/// Group a flat, oldest-first comment list into threads
fn build_threads(comments: Vec<Comment>) -> Vec<CommentThread> {
    let mut threads: Vec<CommentThread> = Vec::new();

    for comment in comments {
        match comment.parent_id {
            None => threads.push(CommentThread {
                comment,
                replies: Vec::new(),
            }),
            Some(parent_id) => {
                if let Some(thread) = threads.iter_mut().find(|t| t.comment.id == parent_id) {
                    thread.replies.push(comment);
                }
                // A reply whose parent is gone was cascade-deleted with
                // it; nothing to attach to.
            }
        }
    }

    threads
}
