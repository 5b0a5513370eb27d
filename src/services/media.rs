//! Media service
//!
//! Business logic for the upload library: validation, UUID-based file
//! naming, disk writes, and the database records that make the library
//! listable without scanning the filesystem.

use crate::config::UploadConfig;
use crate::db::repositories::MediaRepository;
use crate::models::{ListParams, MediaItem, PagedResult};
use anyhow::Context;
use std::sync::Arc;
use tokio::fs;
use uuid::Uuid;

/// Error types for media service operations
#[derive(Debug, thiserror::Error)]
pub enum MediaServiceError {
    /// Media item not found
    #[error("Media item not found: {0}")]
    NotFound(String),

    /// Validation error (type or size)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Media service for uploaded files
pub struct MediaService {
    repo: Arc<dyn MediaRepository>,
    config: Arc<UploadConfig>,
}

impl MediaService {
    /// Create a new media service
    pub fn new(repo: Arc<dyn MediaRepository>, config: Arc<UploadConfig>) -> Self {
        Self { repo, config }
    }

    /// Store an uploaded file
    ///
    /// Validates the MIME type against the allow-list and the payload
    /// against the size limit, writes the bytes under a UUID filename in
    /// the upload directory, and records the upload.
    pub async fn store(
        &self,
        original_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<MediaItem, MediaServiceError> {
        if !self.config.is_type_allowed(content_type) {
            return Err(MediaServiceError::ValidationError(format!(
                "File type '{}' is not allowed",
                content_type
            )));
        }

        if data.is_empty() {
            return Err(MediaServiceError::ValidationError(
                "Empty file".to_string(),
            ));
        }

        if data.len() as u64 > self.config.max_file_size {
            return Err(MediaServiceError::ValidationError(format!(
                "File too large. Maximum size: {} MB",
                self.config.max_file_size / 1024 / 1024
            )));
        }

        if !self.config.path.exists() {
            fs::create_dir_all(&self.config.path)
                .await
                .context("Failed to create upload directory")?;
        }

        let ext = file_extension(original_name, content_type);
        let filename = format!("{}.{}", Uuid::new_v4(), ext);
        let file_path = self.config.path.join(&filename);

        fs::write(&file_path, data)
            .await
            .with_context(|| format!("Failed to write upload: {:?}", file_path))?;

        let item = MediaItem::new(
            filename.clone(),
            original_name.to_string(),
            content_type.to_string(),
            data.len() as i64,
            format!("/uploads/{}", filename),
        );

        let created = match self.repo.create(&item).await {
            Ok(created) => created,
            Err(e) => {
                // Don't leave orphaned files behind when the record fails
                let _ = fs::remove_file(&file_path).await;
                return Err(MediaServiceError::InternalError(
                    e.context("Failed to record upload"),
                ));
            }
        };

        tracing::info!("Stored upload '{}' as {}", original_name, filename);
        Ok(created)
    }

    /// Get a media item by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<MediaItem>, MediaServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get media item")
            .map_err(Into::into)
    }

    /// List media items, newest first
    pub async fn list(
        &self,
        params: &ListParams,
    ) -> Result<PagedResult<MediaItem>, MediaServiceError> {
        self.repo
            .list(params)
            .await
            .context("Failed to list media items")
            .map_err(Into::into)
    }

    /// Delete a media item and its file
    ///
    /// A file already missing from disk is tolerated; the record always
    /// goes away.
    pub async fn delete(&self, id: i64) -> Result<(), MediaServiceError> {
        let item = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get media item")?
            .ok_or_else(|| {
                MediaServiceError::NotFound(format!("Media item {} not found", id))
            })?;

        self.repo
            .delete(item.id)
            .await
            .context("Failed to delete media record")?;

        let file_path = self.config.path.join(&item.filename);
        if let Err(e) = fs::remove_file(&file_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove file {:?}: {}", file_path, e);
            }
        }

        Ok(())
    }

    /// Count all media items
    pub async fn count_all(&self) -> Result<i64, MediaServiceError> {
        self.repo
            .count_all()
            .await
            .context("Failed to count media items")
            .map_err(Into::into)
    }
}

/// Get the storage extension from the original filename or content type
fn file_extension(filename: &str, content_type: &str) -> String {
    if let Some((_, ext)) = filename.rsplit_once('.') {
        if !ext.is_empty() && ext.len() < 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return ext.to_lowercase();
        }
    }

    match content_type {
        "image/jpeg" => "jpg".to_string(),
        "image/png" => "png".to_string(),
        "image/gif" => "gif".to_string(),
        "image/webp" => "webp".to_string(),
        "image/svg+xml" => "svg".to_string(),
        _ => "bin".to_string(),
    }
}
