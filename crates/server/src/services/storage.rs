//! Storage for uploaded images.
//!
//! Handlers talk to the [`ObjectStorage`] trait; [`LocalStorage`] writes
//! under the configured upload directory, which the router serves at
//! `/uploads`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tireshop_core::slug::slugify;

use crate::config::UploadConfig;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Folder used when the client does not name one.
pub const DEFAULT_FOLDER: &str = "general";

/// Error type for storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Only JPEG, PNG, WebP, GIF and AVIF images are allowed (got {0})")]
    UnsupportedType(String),

    #[error("File is too large ({size} bytes, maximum is {max})")]
    TooLarge { size: usize, max: usize },

    #[error("File is empty")]
    Empty,

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

impl StorageError {
    /// Whether the client sent something unacceptable (as opposed to an I/O failure).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

/// Where an upload ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    pub key: String,
    pub url: String,
    pub content_type: String,
    pub size: usize,
}

/// Abstract storage for uploaded files.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `content` under `key` and return its public location.
    async fn put(
        &self,
        key: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<StoredObject, StorageError>;

    /// Remove an object; missing objects are not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Check an image upload and return the file extension to store it under.
///
/// # Errors
///
/// Returns `StorageError` for empty, oversized, or non-image uploads.
pub fn check_image(content_type: &str, size: usize) -> Result<&'static str, StorageError> {
    if size == 0 {
        return Err(StorageError::Empty);
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(StorageError::TooLarge {
            size,
            max: MAX_UPLOAD_BYTES,
        });
    }
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/jpeg" | "image/jpg" => Ok("jpg"),
        "image/png" => Ok("png"),
        "image/webp" => Ok("webp"),
        "image/gif" => Ok("gif"),
        "image/avif" => Ok("avif"),
        _ => Err(StorageError::UnsupportedType(content_type.to_string())),
    }
}

/// Build a fresh key `"{folder}/{uuid}.{ext}"`.
///
/// The folder is slugified so client input never produces path separators.
#[must_use]
pub fn new_object_key(folder: Option<&str>, extension: &str) -> String {
    let folder = folder
        .map(slugify)
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| DEFAULT_FOLDER.to_string());
    format!("{folder}/{}.{extension}", uuid::Uuid::new_v4().simple())
}

/// Local filesystem storage.
pub struct LocalStorage {
    base_path: PathBuf,
    public_url: String,
}

impl LocalStorage {
    #[must_use]
    pub fn new(base_path: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(&config.dir, &config.public_url)
    }

    /// Resolve a key to a path under the base directory.
    fn path_for_key(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let clean = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !clean {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn put(
        &self,
        key: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        let path = self.path_for_key(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;

        tracing::info!(key = %key, size = content.len(), "Stored upload");
        Ok(StoredObject {
            key: key.to_string(),
            url: format!("{}/{key}", self.public_url),
            content_type: content_type.to_string(),
            size: content.len(),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for_key(key)?;
        match tokio::fs::remove_file(path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_check_image() {
        assert_eq!(check_image("image/png", 10).unwrap(), "png");
        assert_eq!(check_image("Image/JPEG; charset=binary", 10).unwrap(), "jpg");
        assert!(matches!(
            check_image("image/svg+xml", 10),
            Err(StorageError::UnsupportedType(_))
        ));
        assert!(matches!(
            check_image("application/pdf", 10),
            Err(StorageError::UnsupportedType(_))
        ));
        assert!(matches!(check_image("image/png", 0), Err(StorageError::Empty)));
        assert!(matches!(
            check_image("image/png", MAX_UPLOAD_BYTES + 1),
            Err(StorageError::TooLarge { .. })
        ));
        assert!(check_image("image/png", MAX_UPLOAD_BYTES).is_ok());
    }

    #[test]
    fn test_new_object_key() {
        let key = new_object_key(Some("../Hero Banners"), "webp");
        assert!(key.starts_with("hero-banners/"));
        assert!(key.ends_with(".webp"));
        assert!(new_object_key(None, "png").starts_with("general/"));
        assert!(new_object_key(Some("///"), "png").starts_with("general/"));
    }

    #[tokio::test]
    async fn test_local_storage_roundtrip() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path(), "https://shop.example.com/uploads/");

        let stored = storage
            .put("brands/logo.png", b"\x89PNG", "image/png")
            .await
            .unwrap();
        assert_eq!(stored.url, "https://shop.example.com/uploads/brands/logo.png");
        assert_eq!(stored.size, 4);
        assert!(dir.path().join("brands/logo.png").exists());

        storage.delete("brands/logo.png").await.unwrap();
        assert!(!dir.path().join("brands/logo.png").exists());
        storage.delete("brands/logo.png").await.unwrap();
    }

    #[tokio::test]
    async fn test_local_storage_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path(), "/uploads");
        for key in ["../escape.png", "/etc/passwd", "", "./b.png"] {
            let err = storage.put(key, b"x", "image/png").await.unwrap_err();
            assert!(matches!(err, StorageError::InvalidKey(_)), "{key}");
        }
    }
}
