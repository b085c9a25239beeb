//! Storage backend abstraction for evidence files.
//!
//! Uploaded attachments and organization reports are stored through this
//! trait; the workflow's delivery path reads them back only at the moment
//! a document is pushed to the citizen.

pub mod local;

use async_trait::async_trait;

/// Storage operation errors.
#[derive(Debug)]
pub enum StorageError {
    /// File not found
    NotFound(String),
    /// I/O error
    Io(std::io::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::NotFound(msg) => write!(f, "Not found: {}", msg),
            StorageError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(e.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

/// Trait for storage backends.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store a file under `filename`; returns the reference to persist.
    async fn put_object(&self, data: Vec<u8>, filename: &str) -> Result<String, StorageError>;

    /// Resolve a stored reference back to its bytes.
    async fn read_object(&self, reference: &str) -> Result<Vec<u8>, StorageError>;

    /// Check if a stored reference exists.
    async fn exists(&self, reference: &str) -> Result<bool, StorageError>;
}
