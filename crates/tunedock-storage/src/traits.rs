use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage configuration error: {0}")]
    ConfigError(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Byte stream handed back to download callers.
pub type ObjectStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Durable object storage for conversion artifacts.
///
/// Keys are flat, slash-separated paths (`{owner}/{folder}/{id}.mp3`).
/// `put` has idempotent overwrite semantics: re-uploading the same key
/// replaces prior content without error. References returned by `put` and
/// `public_url` are stable and safe to serve to any reader.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` at `key`, replacing any previous content.
    ///
    /// # Returns
    /// The public reference (URL) under which the object is reachable.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<String>;

    /// Remove the object at `key`. Deleting a missing object is not an
    /// error; the end state is the same.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Stable public reference for `key`, without touching the backend.
    fn public_url(&self, key: &str) -> String;

    /// Stream the object's bytes.
    async fn get_stream(&self, key: &str) -> StorageResult<ObjectStream>;

    /// Cheap connectivity probe for health reporting.
    async fn check(&self) -> StorageResult<()>;

    /// Which backend this store writes to.
    fn backend(&self) -> StorageBackend;
}
