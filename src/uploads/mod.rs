use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::UploadConfig;

/// Subdirectory of the public directory that holds bootcamp photos
pub const UPLOAD_SUBDIR: &str = "uploads";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Please upload a file")]
    MissingFile,

    #[error("Please upload an image file")]
    NotAnImage,

    #[error("Please upload an image less than {limit} bytes")]
    TooLarge { limit: usize },

    #[error("Problem with file upload: {0}")]
    Io(#[from] std::io::Error),
}

/// A photo received from a client, not yet validated
#[derive(Debug, Clone)]
pub struct PhotoFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl PhotoFile {
    /// Content type must be `image/*` and the payload within `max_bytes`
    pub fn validate(&self, max_bytes: usize) -> Result<(), UploadError> {
        let is_image = self
            .content_type
            .as_deref()
            .is_some_and(|content_type| content_type.starts_with("image"));
        if !is_image {
            return Err(UploadError::NotAnImage);
        }
        if self.bytes.len() > max_bytes {
            return Err(UploadError::TooLarge { limit: max_bytes });
        }
        Ok(())
    }

    /// Extension including the leading dot, empty when the client sent none
    pub fn extension(&self) -> String {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default()
    }

    /// Stored name for a bootcamp's photo, independent of the client file name
    pub fn stored_name(&self, bootcamp_id: Uuid) -> String {
        format!("photo_{}{}", bootcamp_id, self.extension())
    }
}

/// Persists bootcamp photos and reports the name they are stored under
#[async_trait]
pub trait AssetUploader: Send + Sync {
    async fn store_photo(&self, bootcamp_id: Uuid, file: &PhotoFile) -> Result<String, UploadError>;

    /// Remove a stored photo; a photo that is already gone is not an error
    async fn remove_photo(&self, name: &str) -> Result<(), UploadError>;
}

/// Writes photos below the configured public directory
#[derive(Debug, Clone)]
pub struct LocalUploader {
    root: PathBuf,
}

impl LocalUploader {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            root: config.directory.join(UPLOAD_SUBDIR),
        }
    }
}

#[async_trait]
impl AssetUploader for LocalUploader {
    async fn store_photo(&self, bootcamp_id: Uuid, file: &PhotoFile) -> Result<String, UploadError> {
        let name = file.stored_name(bootcamp_id);
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&name), &file.bytes).await?;

        info!("Stored photo {} ({} bytes)", name, file.bytes.len());
        Ok(name)
    }

    async fn remove_photo(&self, name: &str) -> Result<(), UploadError> {
        match tokio::fs::remove_file(self.root.join(name)).await {
            Ok(()) => {
                info!("Removed photo {}", name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
