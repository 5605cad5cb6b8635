use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

use crate::upload::UploadedFile;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid image format: {0}")]
    InvalidImage(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Where uploaded image binaries live.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist an image and return the generated filename.
    async fn store(&self, file: &UploadedFile) -> Result<String, StorageError>;

    /// Delete a previously stored image. Missing files are not an error.
    async fn remove(&self, filename: &str) -> Result<(), StorageError>;
}

/// Reduce a client-supplied filename to a single safe path segment.
///
/// Backslashes count as separators; empty, `.` and `..` segments are dropped
/// and the last remaining segment is kept.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    filename
        .replace('\\', "/")
        .split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .next_back()
        .map(str::to_string)
}

/// Longest client filename kept after the `<uuid>_` prefix, leaving the
/// stored name under the 255-byte filesystem limit.
pub const MAX_FILENAME_BYTES: usize = 200;

const MAX_EXTENSION_BYTES: usize = 16;

/// Shorten `name` to at most `max` bytes on a char boundary, keeping a short
/// extension such as `.png` intact.
pub fn truncate_filename(name: &str, max: usize) -> String {
    if name.len() <= max {
        return name.to_string();
    }

    let (stem, extension) = match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= MAX_EXTENSION_BYTES.min(max) => {
            name.split_at(dot)
        }
        _ => (name, ""),
    };

    let mut end = max - extension.len();
    while !stem.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &stem[..end], extension)
}

/// Local filesystem image storage rooted at a single directory.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    dir: PathBuf,
}

impl LocalImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the upload directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn store(&self, file: &UploadedFile) -> Result<String, StorageError> {
        if !file.is_image() {
            return Err(StorageError::InvalidImage(
                "content type must be image/*".to_string(),
            ));
        }

        let original = file
            .file_name
            .as_deref()
            .ok_or_else(|| StorageError::InvalidImage("missing filename".to_string()))?;
        let sanitized = sanitize_filename(original).ok_or_else(|| {
            StorageError::InvalidImage(format!("unusable filename '{}'", original))
        })?;

        let filename = format!(
            "{}_{}",
            Uuid::new_v4(),
            truncate_filename(&sanitized, MAX_FILENAME_BYTES)
        );

        self.ensure_dir().await?;
        fs::write(self.dir.join(&filename), &file.data).await?;

        tracing::info!(filename = %filename, size = file.size, "Stored image");
        Ok(filename)
    }

    async fn remove(&self, filename: &str) -> Result<(), StorageError> {
        let Some(name) = sanitize_filename(filename) else {
            return Ok(());
        };

        match fs::remove_file(self.dir.join(&name)).await {
            Ok(()) => {
                tracing::info!(filename = %name, "Removed image");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
