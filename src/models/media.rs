//! Media model
//!
//! A media item records one uploaded file: the UUID-based name it was
//! stored under, the name it arrived with, and enough metadata to list
//! the library without touching the filesystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Media entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    /// Unique identifier
    pub id: i64,
    /// Filename on disk (UUID + extension)
    pub filename: String,
    /// Original client-supplied filename
    pub original_name: String,
    /// MIME type as validated at upload time
    pub mime_type: String,
    /// File size in bytes
    pub size_bytes: i64,
    /// Public URL the file is served under
    pub url: String,
    /// Upload timestamp
    pub created_at: DateTime<Utc>,
}

impl MediaItem {
    /// Create a new media item
    pub fn new(
        filename: String,
        original_name: String,
        mime_type: String,
        size_bytes: i64,
        url: String,
    ) -> Self {
        Self {
            id: 0,
            filename,
            original_name,
            mime_type,
            size_bytes,
            url,
            created_at: Utc::now(),
        }
    }
}
