//! Local filesystem storage backend.

use super::{StorageBackend, StorageError};
use async_trait::async_trait;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Local filesystem storage backend.
pub struct LocalStorage {
    /// Base path for file storage
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new local storage backend.
    ///
    /// The `base_path` directory will be created if it doesn't exist.
    pub fn new(base_path: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path)?;
        log::info!("LocalStorage initialized at {:?}", base_path);
        Ok(Self { base_path })
    }

    /// Build from the global application configuration.
    pub fn from_config() -> Result<Self, StorageError> {
        Self::new(PathBuf::from(crate::app_config::storage().local_path))
    }

    /// Resolve a stored reference to a path under the base directory.
    /// References carrying parent components are refused.
    fn resolve(&self, reference: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(reference);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::NotFound(reference.to_string()));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn put_object(&self, data: Vec<u8>, filename: &str) -> Result<String, StorageError> {
        let path = self.resolve(filename)?;
        fs::write(&path, data)?;
        Ok(filename.to_string())
    }

    async fn read_object(&self, reference: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(reference)?;
        Ok(fs::read(&path)?)
    }

    async fn exists(&self, reference: &str) -> Result<bool, StorageError> {
        let path = self.resolve(reference)?;
        Ok(path.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_rt::test]
    async fn test_put_then_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_path_buf()).unwrap();

        let reference = storage
            .put_object(b"answer document".to_vec(), "answer.pdf")
            .await
            .unwrap();
        assert_eq!(reference, "answer.pdf");
        assert!(storage.exists(&reference).await.unwrap());
        assert_eq!(
            storage.read_object(&reference).await.unwrap(),
            b"answer document"
        );
    }

    #[actix_rt::test]
    async fn test_missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_path_buf()).unwrap();

        assert!(!storage.exists("absent.pdf").await.unwrap());
        match storage.read_object("absent.pdf").await {
            Err(StorageError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[actix_rt::test]
    async fn test_parent_components_refused() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_path_buf()).unwrap();

        assert!(storage.read_object("../escape.pdf").await.is_err());
    }
}
