use super::{BUCKET_URL, SIGNED_ENDPOINT, SITE_URL};
use async_trait::async_trait;
use attache_core::{FileError, FileRecord, FileResult};
use attache_services::{BackendHint, CloudUploader};
use attache_storage::{LocalStorage, ObjectStorage, PathResolver, StorageDispatcher};
use std::path::PathBuf;
use tempfile::TempDir;

/// Temporary public and private roots.
pub struct TestStorage {
    pub temp_dir: TempDir,
}

impl TestStorage {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        Self { temp_dir }
    }

    pub fn public_path(&self) -> PathBuf {
        self.temp_dir.path().join("public")
    }

    pub fn private_path(&self) -> PathBuf {
        self.temp_dir.path().join("private")
    }

    pub async fn dispatcher(&self) -> StorageDispatcher {
        let resolver =
            PathResolver::new(SITE_URL, SIGNED_ENDPOINT).with_bucket_url_prefix(BUCKET_URL);
        StorageDispatcher::new(
            resolver,
            LocalStorage::new(self.public_path())
                .await
                .expect("Failed to create public root"),
            LocalStorage::new(self.private_path())
                .await
                .expect("Failed to create private root"),
            Some(ObjectStorage::in_memory("mybucket", BUCKET_URL)),
        )
    }
}

impl Default for TestStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// Uploader whose bucket is always unreachable.
pub struct FailingUploader;

#[async_trait]
impl CloudUploader for FailingUploader {
    async fn upload(&self, _record: &FileRecord, _hint: BackendHint) -> FileResult<String> {
        Err(FileError::backend_unavailable("bucket offline"))
    }
}
