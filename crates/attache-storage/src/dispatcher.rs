//! Storage dispatch
//!
//! Resolves a record once and routes the operation to the adapter that owns
//! the resolved location. Every operation is a single match over
//! [`ResolvedLocation`]; nothing downstream re-derives a backend from the shape
//! of a string.

use crate::keys::{content_hash, hashed_file_name};
use crate::local::LocalStorage;
use crate::resolver::PathResolver;
use crate::s3::ObjectStorage;
use crate::traits::BlobStore;
use attache_core::{
    ContentEncoding, FileContent, FileError, FileRecord, FileResult, LocalRoot, ResolvedLocation,
};
use bytes::Bytes;
use std::time::Duration;

const DEFAULT_PRESIGN_EXPIRY: Duration = Duration::from_secs(120);

/// Outcome of placing inline content on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPlacement {
    pub location: ResolvedLocation,
    /// False when identical content was already stored under the same name
    pub written: bool,
}

#[derive(Debug, Clone)]
pub struct StorageDispatcher {
    resolver: PathResolver,
    public: LocalStorage,
    private: LocalStorage,
    objects: Option<ObjectStorage>,
    presign_expiry: Duration,
}

impl StorageDispatcher {
    pub fn new(
        resolver: PathResolver,
        public: LocalStorage,
        private: LocalStorage,
        objects: Option<ObjectStorage>,
    ) -> Self {
        StorageDispatcher {
            resolver,
            public,
            private,
            objects,
            presign_expiry: DEFAULT_PRESIGN_EXPIRY,
        }
    }

    pub fn with_presign_expiry(mut self, expiry: Duration) -> Self {
        self.presign_expiry = expiry;
        self
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn object_storage(&self) -> Option<&ObjectStorage> {
        self.objects.as_ref()
    }

    pub fn local_storage(&self, root: LocalRoot) -> &LocalStorage {
        match root {
            LocalRoot::Public => &self.public,
            LocalRoot::Private => &self.private,
        }
    }

    pub fn resolve(&self, record: &FileRecord) -> FileResult<Option<ResolvedLocation>> {
        self.resolver.resolve(record)
    }

    fn bucket_for(&self, location: &ResolvedLocation) -> FileResult<&ObjectStorage> {
        self.objects.as_ref().ok_or_else(|| FileError::NotManagedError {
            backend: location.backend(),
            reference: format!("no object store is configured for key {}", location.key()),
        })
    }

    /// Decode inline content and store it under the record's file name in the
    /// public or private tree.
    ///
    /// Sets `file_url`, `file_size` and `content_hash` and clears the inline
    /// content. When a different file already occupies the name, the name gets
    /// a short content-hash suffix; identical content is not written twice.
    #[tracing::instrument(skip(self, record, content), fields(file_name = ?record.file_name, is_private = record.is_private))]
    pub async fn write_inline_content(
        &self,
        record: &mut FileRecord,
        content: Bytes,
        encoding: ContentEncoding,
    ) -> FileResult<LocalPlacement> {
        if record.is_folder {
            return Err(FileError::FolderContentError(
                record.display_name().unwrap_or_default().to_string(),
            ));
        }

        let file_name = record
            .display_name()
            .ok_or_else(|| FileError::InvalidInput("File name is required".to_string()))?
            .to_string();
        if file_name.contains(['/', '\\']) {
            return Err(FileError::UnsafePath(format!(
                "File name cannot contain a path separator: {}",
                file_name
            )));
        }

        let data = encoding.decode(content)?;
        let hash = content_hash(&data);
        let root = LocalRoot::for_private(record.is_private);
        let store = self.local_storage(root);

        let mut location = self.local_location(&file_name, record.is_private)?;
        let mut written = true;

        if store.exists(location.key()).await? {
            let existing = store.get(location.key()).await?;
            if content_hash(&existing) == hash {
                written = false;
            } else {
                let renamed = hashed_file_name(&file_name, &hash);
                location = self.local_location(&renamed, record.is_private)?;
                // A previous write of this exact content already took the name.
                written = !store.exists(location.key()).await?;
                record.file_name = Some(renamed);
            }
        }

        if written {
            store.put(location.key(), data.clone()).await?;
        } else {
            tracing::debug!(key = %location.key(), "Identical content already stored; reusing file");
        }

        record.file_url = location.local_url();
        record.file_size = Some(data.len() as u64);
        record.content_hash = Some(hash);
        record.content = None;
        record.content_encoding = ContentEncoding::Raw;

        Ok(LocalPlacement { location, written })
    }

    fn local_location(&self, file_name: &str, is_private: bool) -> FileResult<ResolvedLocation> {
        match self.resolver.resolve_reference(file_name, is_private)? {
            location @ ResolvedLocation::Local { .. } => Ok(location),
            other => Err(FileError::InvalidReference(format!(
                "File name {} does not resolve to local storage ({})",
                file_name,
                other.backend()
            ))),
        }
    }

    /// Read a record's content from whichever backend holds it.
    ///
    /// The result is text when the bytes are valid UTF-8 and binary
    /// otherwise. Nothing is cached; callers keep the returned value if they
    /// need it again.
    #[tracing::instrument(skip(self, record), fields(file_url = ?record.file_url))]
    pub async fn read_content(&self, record: &FileRecord) -> FileResult<FileContent> {
        if record.is_folder {
            return Err(FileError::FolderContentError(
                record.display_name().unwrap_or_default().to_string(),
            ));
        }

        let location = self.resolve(record)?.ok_or_else(|| {
            FileError::InvalidReference("Record has neither a file url nor a file name".to_string())
        })?;

        self.read_location(&location).await
    }

    pub async fn read_location(&self, location: &ResolvedLocation) -> FileResult<FileContent> {
        let raw = match location {
            ResolvedLocation::Local { root, key } => self.local_storage(*root).get(key).await?,
            ResolvedLocation::ObjectStore { key } | ResolvedLocation::SignedEndpoint { key } => {
                self.bucket_for(location)?.get(key).await?
            }
            ResolvedLocation::Remote { url } => {
                return Err(FileError::NotManagedError {
                    backend: location.backend(),
                    reference: url.clone(),
                })
            }
        };

        Ok(FileContent::classify(raw))
    }

    /// Remove the bytes a record points at.
    ///
    /// Idempotent: a missing local file or object is success. Remote
    /// references, folders and empty records own nothing and are a no-op.
    #[tracing::instrument(skip(self, record), fields(file_url = ?record.file_url))]
    pub async fn delete_backend_object(&self, record: &FileRecord) -> FileResult<()> {
        if record.is_folder {
            return Ok(());
        }

        match self.resolve(record)? {
            Some(location) => self.delete_location(&location).await,
            None => Ok(()),
        }
    }

    pub async fn delete_location(&self, location: &ResolvedLocation) -> FileResult<()> {
        match location {
            ResolvedLocation::Local { root, key } => {
                self.local_storage(*root).delete(key).await?;
            }
            ResolvedLocation::ObjectStore { key } | ResolvedLocation::SignedEndpoint { key } => {
                match self.objects.as_ref() {
                    Some(objects) => objects.delete(key).await?,
                    None => {
                        tracing::warn!(key = %key, "No object store configured; nothing to delete")
                    }
                }
            }
            ResolvedLocation::Remote { url } => {
                tracing::debug!(url = %url, "Remote file is not owned; skipping delete");
            }
        }
        Ok(())
    }

    /// Whether the bytes a location points at are present.
    pub async fn exists(&self, location: &ResolvedLocation) -> FileResult<bool> {
        match location {
            ResolvedLocation::Local { root, key } => Ok(self.local_storage(*root).exists(key).await?),
            ResolvedLocation::ObjectStore { key } | ResolvedLocation::SignedEndpoint { key } => {
                Ok(self.bucket_for(location)?.exists(key).await?)
            }
            ResolvedLocation::Remote { .. } => Err(FileError::NotManagedError {
                backend: location.backend(),
                reference: location.key().to_string(),
            }),
        }
    }

    /// Store bytes in the bucket under `key`.
    pub async fn put_object(&self, key: &str, data: Bytes) -> FileResult<()> {
        let location = ResolvedLocation::ObjectStore {
            key: key.to_string(),
        };
        self.bucket_for(&location)?.put(key, data).await?;
        Ok(())
    }

    /// URL a client can fetch the record's bytes from.
    ///
    /// Local files map to their site path, bucket objects to a presigned GET
    /// URL, remote files to their own URL.
    pub async fn retrieval_url(&self, record: &FileRecord) -> FileResult<String> {
        let location = self.resolve(record)?.ok_or_else(|| {
            FileError::InvalidReference("Record has neither a file url nor a file name".to_string())
        })?;

        match &location {
            ResolvedLocation::Local { .. } => Ok(location.local_url().unwrap_or_default()),
            ResolvedLocation::ObjectStore { key } | ResolvedLocation::SignedEndpoint { key } => {
                let url = self
                    .bucket_for(&location)?
                    .presigned_url(key, self.presign_expiry)
                    .await?;
                Ok(url)
            }
            ResolvedLocation::Remote { url } => Ok(url.clone()),
        }
    }
}
