//! Comment model
//!
//! Comments are guest-authored (name required, email optional) and become
//! visible as soon as they are created. Threading is a single level deep:
//! replies reference a top-level parent on the same post.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Comment entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    /// Unique identifier
    pub id: i64,
    /// Post the comment belongs to
    pub post_id: i64,
    /// Parent comment for replies
    pub parent_id: Option<i64>,
    /// Display name of the author
    pub author_name: String,
    /// Author email (never serialized to the public API)
    #[serde(skip_serializing)]
    pub author_email: Option<String>,
    /// MD5 of the lowercased trimmed email, for gravatar-style avatars
    pub avatar_hash: Option<String>,
    /// Comment body (plain text)
    pub content: String,
    /// Client IP (never serialized to the public API)
    #[serde(skip_serializing)]
    pub ip_address: Option<String>,
    /// Client user agent (never serialized to the public API)
    #[serde(skip_serializing)]
    pub user_agent: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// A top-level comment with its replies, as rendered on a post
#[derive(Debug, Clone, Serialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

/// Input for creating a comment
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentInput {
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub author_name: String,
    pub author_email: Option<String>,
    pub content: String,
}
