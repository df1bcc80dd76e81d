use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::{ensure_relative, generate_photo_path, join_url, FileStorage, StorageError};

/// Local-disk storage rooted at a directory, served under `public_url_prefix`.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
    public_url_prefix: String,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>, public_url_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url_prefix: public_url_prefix.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        ensure_relative(path)?;
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn store(&self, bytes: Bytes, suggested_name: &str) -> Result<String, StorageError> {
        let path = generate_photo_path(suggested_name);
        let full_path = self.full_path(&path)?;
        debug!(storage_path = %path, size = bytes.len(), "file_storage: write");

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "file_storage: create_dir_all failed");
                e
            })?;
        }

        // temp file + rename so readers never see a partial image
        let temp_path = full_path.with_extension("part");
        let mut file = fs::File::create(&temp_path).await?;
        if let Err(e) = file.write_all(&bytes).await {
            drop(file);
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        file.sync_all().await?;
        drop(file);

        if let Err(e) = fs::rename(&temp_path, &full_path).await {
            warn!(from = %temp_path.display(), to = %full_path.display(), error = %e, "file_storage: rename failed");
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(path)
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let full_path = self.full_path(path)?;
        Ok(fs::try_exists(full_path).await?)
    }

    async fn delete(&self, path: &str) -> Result<bool, StorageError> {
        let full_path = self.full_path(path)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, path: &str) -> String {
        join_url(&self.public_url_prefix, path)
    }
}
