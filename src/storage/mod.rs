//! Backing file storage for uploaded photos.
//!
//! Records in `product_photos` only hold a storage-relative path; the bytes
//! live behind a [`FileStorage`] implementation. Stored names are always
//! generated (UUID v4) so that two uploads of `IMG_0001.jpg` never collide
//! and client-supplied names never reach the filesystem.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

mod local;
mod memory;

pub use local::LocalFileStorage;
pub use memory::InMemoryFileStorage;

/// Directory (key prefix) under which product photos are stored
pub const PRODUCT_PHOTO_DIR: &str = "products";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Persist `bytes` under a freshly generated name and return the
    /// storage-relative path. Only the extension of `suggested_name` is kept.
    async fn store(&self, bytes: Bytes, suggested_name: &str) -> Result<String, StorageError>;

    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Remove the file at `path`. Returns `false` when there was nothing to remove.
    async fn delete(&self, path: &str) -> Result<bool, StorageError>;

    /// Public URL clients use to fetch the file.
    fn public_url(&self, path: &str) -> String;
}

/// Builds `products/<uuid>.<ext>` from a client-supplied file name.
pub fn generate_photo_path(suggested_name: &str) -> String {
    let extension = Path::new(suggested_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("{}/{}.{}", PRODUCT_PHOTO_DIR, Uuid::new_v4(), ext),
        None => format!("{}/{}", PRODUCT_PHOTO_DIR, Uuid::new_v4()),
    }
}

/// Rejects absolute paths and any `..`/empty segment.
pub fn ensure_relative(path: &str) -> Result<(), StorageError> {
    let invalid = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");

    if invalid {
        Err(StorageError::InvalidPath(path.to_string()))
    } else {
        Ok(())
    }
}

pub(crate) fn join_url(prefix: &str, path: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), path.trim_start_matches('/'))
}
