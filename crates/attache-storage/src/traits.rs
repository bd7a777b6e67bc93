//! Blob adapter trait
//!
//! This module defines the adapter trait both the local file trees and the
//! bucket implement. Adapters own no policy: which key, which backend and
//! whether a path is safe are decided by the resolver and the dispatcher.

use async_trait::async_trait;
use attache_core::{FileError, StorageBackend};
use bytes::Bytes;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for FileError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => FileError::NotFound(key),
            StorageError::InvalidKey(key) => FileError::UnsafePath(key),
            other => FileError::BackendUnavailable {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }
}

/// Byte-level adapter over one storage medium
///
/// `delete` is idempotent: deleting a missing key succeeds.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read the bytes stored under `key`
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Store `data` under `key`, replacing any previous content
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Remove `key`; a missing key is not an error
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check if a key exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
