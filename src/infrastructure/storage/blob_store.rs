use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("blob store request failed for '{key}': {message}")]
    Backend { key: String, message: String },
    #[error("invalid storage request: {0}")]
    Invalid(String),
}

impl StorageError {
    pub fn backend(key: &str, message: impl Into<String>) -> Self {
        Self::Backend {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Durable object storage for documents and their derivatives.
///
/// Keys follow the `{owner}/{documentId}/{artifact}` layout produced by
/// [`super::DocumentKey`]. A missing object is not an error: `get` returns
/// `Ok(None)` and `delete` succeeds.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the object stored under `key`, `None` when it does not exist
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store `bytes` under `key`, replacing any previous content
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    /// Remove the object under `key`. Idempotent.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// List every key starting with `prefix`, in lexicographic order
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Time-limited download URL for `key`
    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, StorageError>;
}
