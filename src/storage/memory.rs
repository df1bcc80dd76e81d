use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{ensure_relative, generate_photo_path, join_url, FileStorage, StorageError};

/// Map-backed storage for tests and ephemeral deployments.
///
/// Writes and deletes can be switched to fail, which is how the upload and
/// removal error policies are exercised.
#[derive(Debug, Default)]
pub struct InMemoryFileStorage {
    files: DashMap<String, Bytes>,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
    public_url_prefix: String,
}

impl InMemoryFileStorage {
    pub fn new() -> Self {
        Self {
            public_url_prefix: "/storage".to_string(),
            ..Default::default()
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn read(&self, path: &str) -> Option<Bytes> {
        self.files.get(path).map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl FileStorage for InMemoryFileStorage {
    async fn store(&self, bytes: Bytes, suggested_name: &str) -> Result<String, StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("writes disabled".to_string()));
        }
        let path = generate_photo_path(suggested_name);
        self.files.insert(path.clone(), bytes);
        Ok(path)
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        ensure_relative(path)?;
        Ok(self.files.contains_key(path))
    }

    async fn delete(&self, path: &str) -> Result<bool, StorageError> {
        ensure_relative(path)?;
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("deletes disabled".to_string()));
        }
        Ok(self.files.remove(path).is_some())
    }

    fn public_url(&self, path: &str) -> String {
        join_url(&self.public_url_prefix, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failure_switches() {
        let storage = InMemoryFileStorage::new();
        let path = storage
            .store(Bytes::from_static(b"GIF89a"), "a.gif")
            .await
            .unwrap();
        assert!(storage.contains(&path));

        storage.fail_writes(true);
        assert!(storage.store(Bytes::new(), "b.gif").await.is_err());
        assert_eq!(storage.len(), 1);

        storage.fail_deletes(true);
        assert!(storage.delete(&path).await.is_err());
        assert!(storage.contains(&path));

        storage.fail_deletes(false);
        assert!(storage.delete(&path).await.unwrap());
        assert!(storage.is_empty());
    }
}
