//! Object storage abstraction for uploaded media files.
//!
//! Contributions carry attached media; the core only handles opaque storage
//! keys and delegates the bytes to a [`StorageBackend`].

use std::path::PathBuf;

use crate::{AppError, AppResult};

/// Uploaded file metadata.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Storage key (path or object key).
    pub key: String,
    /// Public URL to access the file.
    pub url: String,
    /// File size in bytes.
    pub size: u64,
    /// MIME content type.
    pub content_type: String,
}

/// Storage backend trait.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Upload a file.
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<UploadedFile>;

    /// Delete a file.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Get the public URL for a key.
    fn public_url(&self, key: &str) -> String;

    /// Check if a file exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;
}

/// Derives a storage key from an entity id and the original file name.
///
/// The extension is the only part of the client-provided name that survives;
/// everything else comes from the server-generated id.
#[must_use]
pub fn generate_storage_key(id: &str, file_name: &str) -> String {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(char::is_alphanumeric));

    match ext {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    }
}

/// Local filesystem storage backend.
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new local storage backend.
    #[must_use]
    pub const fn new(base_path: PathBuf, base_url: String) -> Self {
        Self { base_path, base_url }
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<UploadedFile> {
        let path = self.base_path.join(key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {e}")))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {e}")))?;

        Ok(UploadedFile {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.base_path.join(key);
        if path.exists() {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to delete file: {e}")))?;
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let path = self.base_path.join(key);
        Ok(path.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_key_keeps_extension() {
        assert_eq!(generate_storage_key("abc", "photo.JPG"), "abc.jpg");
        assert_eq!(generate_storage_key("abc", "no-extension"), "abc");
        assert_eq!(generate_storage_key("abc", "weird.t@r"), "abc");
    }

    #[tokio::test]
    async fn local_storage_round_trip() {
        let dir = std::env::temp_dir().join(format!("geonote-storage-{}", std::process::id()));
        let storage = LocalStorage::new(dir.clone(), "/files".to_string());

        let uploaded = storage.upload("a/b.png", b"data", "image/png").await.unwrap();
        assert_eq!(uploaded.url, "/files/a/b.png");
        assert!(storage.exists("a/b.png").await.unwrap());

        storage.delete("a/b.png").await.unwrap();
        assert!(!storage.exists("a/b.png").await.unwrap());

        let _ = tokio::fs::remove_dir_all(dir).await;
    }
}
