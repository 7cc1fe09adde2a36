//! Media file storage
//!
//! Uploaded media lands on the local filesystem under the application data
//! directory, one subtree per sender:
//!
//! ```text
//! {base_path}/user/{sender_id}/{uuid}.{ext}
//! ```
//!
//! The relative path is what gets persisted on the message row; reads
//! resolve it against the base path and refuse anything that escapes it.

use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

use crate::core::constants::MEDIA_DEFAULT_EXTENSION;
use crate::core::storage::{AppStorage, DataSubdir};

#[derive(Error, Debug)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid media path: {0}")]
    InvalidPath(String),
}

/// Local filesystem storage for uploaded media
#[derive(Debug, Clone)]
pub struct FileService {
    base_path: PathBuf,
}

impl FileService {
    pub fn new(storage: &AppStorage) -> Self {
        Self {
            base_path: storage.subdir(DataSubdir::Files),
        }
    }

    #[cfg(test)]
    pub fn with_base_path(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Store media bytes for a sender, returning the relative path
    pub async fn save(
        &self,
        bytes: &[u8],
        extension: Option<&str>,
        sender_id: Uuid,
    ) -> Result<String, FileError> {
        let ext = sanitize_extension(extension);
        let relative = format!("user/{}/{}.{}", sender_id, Uuid::new_v4(), ext);
        let target = self.base_path.join(&relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        tracing::debug!(path = %relative, size = bytes.len(), "media stored");
        Ok(relative)
    }

    /// Read media bytes by the relative path stored on a message
    pub async fn read(&self, relative: &str) -> Result<Vec<u8>, FileError> {
        let target = self.resolve(relative)?;
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FileError::NotFound(relative.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Join against the base path, rejecting traversal components
    fn resolve(&self, relative: &str) -> Result<PathBuf, FileError> {
        let path = Path::new(relative);
        let escapes = path.is_absolute()
            || path
                .components()
                .any(|c| !matches!(c, std::path::Component::Normal(_)));
        if escapes {
            return Err(FileError::InvalidPath(relative.to_string()));
        }
        Ok(self.base_path.join(path))
    }
}

/// Lowercased alphanumeric extension, capped at 8 chars
fn sanitize_extension(extension: Option<&str>) -> String {
    let cleaned: String = extension
        .unwrap_or_default()
        .trim()
        .trim_start_matches('.')
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(8)
        .collect::<String>()
        .to_lowercase();
    if cleaned.is_empty() {
        MEDIA_DEFAULT_EXTENSION.to_string()
    } else {
        cleaned
    }
}
