//! Cloud placement step run after content lands on local disk.

use async_trait::async_trait;
use attache_core::{FileError, FileRecord, FileResult, ResolvedLocation};
use attache_storage::keys::generate_object_key;
use attache_storage::{BlobStore, StorageDispatcher};
use std::sync::Arc;

/// Which URL form the uploaded object should be referenced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendHint {
    /// Public bucket URL
    ObjectStore,
    /// Signed retrieval endpoint path
    SignedEndpoint,
}

impl BackendHint {
    /// Private files are only reachable through the signed endpoint.
    pub fn for_record(record: &FileRecord) -> Self {
        if record.is_private {
            BackendHint::SignedEndpoint
        } else {
            BackendHint::ObjectStore
        }
    }
}

/// Moves a locally placed file to its durable location.
///
/// Returns the record's final `file_url`. Failures are surfaced as
/// `BackendUnavailable` so the caller can undo the local placement.
#[async_trait]
pub trait CloudUploader: Send + Sync {
    async fn upload(&self, record: &FileRecord, hint: BackendHint) -> FileResult<String>;
}

/// Keeps files on local disk; the final URL is the local one.
pub struct LocalOnlyUploader;

#[async_trait]
impl CloudUploader for LocalOnlyUploader {
    async fn upload(&self, record: &FileRecord, _hint: BackendHint) -> FileResult<String> {
        record
            .url()
            .map(str::to_string)
            .ok_or_else(|| FileError::InvalidReference("Record has no file url".to_string()))
    }
}

/// Uploads local files into the configured bucket.
///
/// The local copy is left in place; only the caller knows whether the record
/// owns it.
pub struct ObjectStoreUploader {
    dispatcher: Arc<StorageDispatcher>,
    key_prefix: String,
}

impl ObjectStoreUploader {
    pub fn new(dispatcher: Arc<StorageDispatcher>, key_prefix: impl Into<String>) -> Self {
        ObjectStoreUploader {
            dispatcher,
            key_prefix: key_prefix.into(),
        }
    }
}

#[async_trait]
impl CloudUploader for ObjectStoreUploader {
    #[tracing::instrument(skip(self, record), fields(file_url = ?record.file_url))]
    async fn upload(&self, record: &FileRecord, hint: BackendHint) -> FileResult<String> {
        let location = self
            .dispatcher
            .resolve(record)?
            .ok_or_else(|| FileError::InvalidReference("Record has no file reference".to_string()))?;

        let (root, local_key) = match &location {
            ResolvedLocation::Local { root, key } => (*root, key),
            // Already in the bucket or not ours to move.
            _ => return Ok(record.url().unwrap_or(location.key()).to_string()),
        };

        let data = self.dispatcher.local_storage(root).get(local_key).await?;
        let key = generate_object_key(&self.key_prefix, record);
        self.dispatcher.put_object(&key, data).await?;

        let resolver = self.dispatcher.resolver();
        let url = match hint {
            BackendHint::SignedEndpoint => resolver.signed_endpoint_url(&key),
            BackendHint::ObjectStore => match resolver.bucket_url(&key) {
                Some(url) => url,
                None => resolver.signed_endpoint_url(&key),
            },
        };

        tracing::info!(key = %key, url = %url, "Uploaded file to object store");
        Ok(url)
    }
}
