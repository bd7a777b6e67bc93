//! File record lifecycle
//!
//! Drives a record through `New → Validated → ContentPlaced → Persisted →
//! Trashed`. The hosting framework calls these operations from its own hooks;
//! the controller never subclasses or stores the record itself.

use crate::cloud::{BackendHint, CloudUploader};
use attache_core::{
    AttachmentHost, AttachmentNote, FileContent, FileError, FileRecord, FileResult,
    ResolvedLocation,
};
use attache_storage::{BlobStore, StorageDispatcher};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    New,
    Validated,
    ContentPlaced,
    Persisted,
    Trashed,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::New => "New",
            LifecycleState::Validated => "Validated",
            LifecycleState::ContentPlaced => "ContentPlaced",
            LifecycleState::Persisted => "Persisted",
            LifecycleState::Trashed => "Trashed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record plus what this process has done to storage on its behalf.
#[derive(Debug, Clone)]
pub struct TrackedFile {
    pub record: FileRecord,
    state: LifecycleState,
    /// Local file written by `place_content` and still on disk; `None` when
    /// the bytes were already there or were removed after upload.
    local_write: Option<ResolvedLocation>,
    /// Bucket object created by the cloud upload step
    uploaded: Option<ResolvedLocation>,
}

impl TrackedFile {
    pub fn new(record: FileRecord) -> Self {
        TrackedFile {
            record,
            state: LifecycleState::New,
            local_write: None,
            uploaded: None,
        }
    }

    /// Track a record that is already committed to the document store.
    pub fn persisted(record: FileRecord) -> Self {
        TrackedFile {
            state: LifecycleState::Persisted,
            ..TrackedFile::new(record)
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn local_write(&self) -> Option<&ResolvedLocation> {
        self.local_write.as_ref()
    }

    pub fn uploaded(&self) -> Option<&ResolvedLocation> {
        self.uploaded.as_ref()
    }

    pub fn into_record(self) -> FileRecord {
        self.record
    }

    fn expect_state(&self, expected: &[LifecycleState], to: LifecycleState) -> FileResult<()> {
        if expected.contains(&self.state) {
            Ok(())
        } else {
            Err(FileError::InvalidTransition {
                from: self.state.as_str(),
                to: to.as_str(),
            })
        }
    }
}

pub struct FileLifecycleController {
    dispatcher: Arc<StorageDispatcher>,
    uploader: Arc<dyn CloudUploader>,
    host: Arc<dyn AttachmentHost>,
    max_attachments: Option<usize>,
    delete_local_after_upload: bool,
}

impl FileLifecycleController {
    pub fn new(
        dispatcher: Arc<StorageDispatcher>,
        uploader: Arc<dyn CloudUploader>,
        host: Arc<dyn AttachmentHost>,
    ) -> Self {
        FileLifecycleController {
            dispatcher,
            uploader,
            host,
            max_attachments: None,
            delete_local_after_upload: true,
        }
    }

    pub fn with_max_attachments(mut self, limit: Option<usize>) -> Self {
        self.max_attachments = limit;
        self
    }

    /// Whether a file this record wrote locally is removed once it is in the
    /// bucket
    pub fn with_delete_local_after_upload(mut self, delete_local: bool) -> Self {
        self.delete_local_after_upload = delete_local;
        self
    }

    pub fn dispatcher(&self) -> &StorageDispatcher {
        &self.dispatcher
    }

    /// `New → Validated`.
    ///
    /// Normalizes names and folder, checks the owner's attachment limit and
    /// validates the file URL. Nothing is written.
    #[tracing::instrument(skip(self, file), fields(file_name = ?file.record.file_name, file_url = ?file.record.file_url))]
    pub async fn validate(&self, file: &mut TrackedFile) -> FileResult<()> {
        file.expect_state(&[LifecycleState::New], LifecycleState::Validated)?;
        let record = &mut file.record;

        record.file_name = record
            .file_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        record.file_url = record
            .file_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string);

        if record.is_folder {
            let name = record
                .display_name()
                .ok_or_else(|| FileError::InvalidInput("Folder name is required".to_string()))?;
            check_file_name(name)?;
        } else {
            self.validate_file_url(record)?;

            if record.file_name.is_none() {
                record.file_name = self.file_name_from_url(record)?;
            }
            let name = record.display_name().ok_or_else(|| {
                FileError::InvalidInput("File name or file URL is required".to_string())
            })?;
            check_file_name(name)?;
        }

        record.ensure_name();
        if record.folder.as_deref().map_or(true, str::is_empty) {
            record.folder = Some(record.default_folder().to_string());
        }

        self.check_attachment_limit(record).await?;

        file.state = LifecycleState::Validated;
        Ok(())
    }

    fn validate_file_url(&self, record: &mut FileRecord) -> FileResult<()> {
        if record.is_remote_file {
            let raw = record
                .url()
                .ok_or_else(|| FileError::InvalidRemoteUrl("Remote file has no URL".to_string()))?;
            return check_remote_url(raw);
        }

        if record.url().is_none() {
            return Ok(());
        }

        // Unknown shapes fail here with InvalidReference or UnsafePath.
        if let Some(ResolvedLocation::Remote { url }) = self.dispatcher.resolve(record)? {
            check_remote_url(&url)?;
            tracing::debug!(url = %url, "External URL; marking record as remote file");
            record.is_remote_file = true;
        }
        Ok(())
    }

    fn file_name_from_url(&self, record: &FileRecord) -> FileResult<Option<String>> {
        let Some(url) = record.url() else {
            return Ok(None);
        };

        if let Some(location) = self.dispatcher.resolve(record)? {
            if !matches!(location, ResolvedLocation::Remote { .. }) {
                return Ok(last_segment(location.key()).map(str::to_string));
            }
        }

        let parsed = url::Url::parse(url).map_err(|e| FileError::InvalidRemoteUrl(e.to_string()))?;
        let segment = parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(|s| {
                urlencoding::decode(s)
                    .map(|decoded| decoded.into_owned())
                    .unwrap_or_else(|_| s.to_string())
            });
        Ok(segment)
    }

    async fn check_attachment_limit(&self, record: &FileRecord) -> FileResult<()> {
        let (Some(limit), Some((doctype, name))) = (self.max_attachments, record.attachment_owner())
        else {
            return Ok(());
        };

        let count = self
            .host
            .attachment_count(doctype, name)
            .await
            .map_err(|e| {
                FileError::backend_unavailable(format!("Failed to count attachments: {}", e))
            })?;

        if count >= limit {
            return Err(FileError::AttachmentLimitExceeded {
                doctype: doctype.to_string(),
                name: name.to_string(),
                limit,
            });
        }
        Ok(())
    }

    /// `Validated → ContentPlaced`.
    ///
    /// Writes inline content to local disk and hands it to the cloud upload
    /// step. If the upload fails the local write is removed, the record is
    /// restored and the state stays `Validated`.
    #[tracing::instrument(skip(self, file), fields(file_name = ?file.record.file_name, is_private = file.record.is_private))]
    pub async fn place_content(&self, file: &mut TrackedFile) -> FileResult<()> {
        file.expect_state(&[LifecycleState::Validated], LifecycleState::ContentPlaced)?;

        if file.record.is_folder || file.record.is_remote_file {
            file.state = LifecycleState::ContentPlaced;
            return Ok(());
        }

        match file.record.content.clone() {
            Some(content) => self.place_inline(file, content).await?,
            None => self.check_existing_reference(&file.record).await?,
        }

        file.state = LifecycleState::ContentPlaced;
        Ok(())
    }

    async fn place_inline(&self, file: &mut TrackedFile, content: bytes::Bytes) -> FileResult<()> {
        let snapshot = file.record.clone();
        let encoding = file.record.content_encoding;

        let placement = self
            .dispatcher
            .write_inline_content(&mut file.record, content, encoding)
            .await?;
        let local_write = placement.written.then(|| placement.location.clone());

        let hint = BackendHint::for_record(&file.record);
        match self.uploader.upload(&file.record, hint).await {
            Ok(url) => {
                if file.record.url() != Some(url.as_str()) {
                    file.record.file_url = Some(url);
                    file.uploaded = self
                        .dispatcher
                        .resolve(&file.record)?
                        .filter(|location| location.object_key().is_some());
                }
                file.local_write = local_write;

                if file.uploaded.is_some() && self.delete_local_after_upload {
                    if let Some(location) = file.local_write.take() {
                        if !self.remove_unless_shared(&file.record, &location).await {
                            file.local_write = Some(location);
                        }
                    }
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    file_name = ?file.record.file_name,
                    "Cloud upload failed; removing local write"
                );
                if let Some(location) = local_write {
                    if let Err(cleanup) = self.dispatcher.delete_location(&location).await {
                        tracing::warn!(
                            error = %cleanup,
                            key = %location.key(),
                            "Failed to remove local write after upload failure"
                        );
                    }
                }
                file.record = snapshot;
                Err(e)
            }
        }
    }

    async fn check_existing_reference(&self, record: &FileRecord) -> FileResult<()> {
        let location = self.dispatcher.resolve(record)?.ok_or_else(|| {
            FileError::InvalidInput("File has no content and no file URL".to_string())
        })?;

        match &location {
            ResolvedLocation::Local { root, key } => {
                if !self.dispatcher.local_storage(*root).exists(key).await? {
                    return Err(FileError::NotFound(key.clone()));
                }
            }
            // Bucket references are accepted as-is; the object is not looked up.
            ResolvedLocation::ObjectStore { key } | ResolvedLocation::SignedEndpoint { key } => {
                tracing::debug!(key = %key, "Record already points at the object store");
            }
            ResolvedLocation::Remote { .. } => {}
        }
        Ok(())
    }

    /// `Validated → ContentPlaced` in one call, as run before the record is
    /// inserted.
    pub async fn before_insert(&self, file: &mut TrackedFile) -> FileResult<()> {
        self.validate(file).await?;
        self.place_content(file).await
    }

    /// `ContentPlaced → Persisted`; appends an attachment note to the owner.
    #[tracing::instrument(skip(self, file), fields(file_name = ?file.record.file_name))]
    pub async fn mark_persisted(&self, file: &mut TrackedFile) -> FileResult<()> {
        file.expect_state(&[LifecycleState::ContentPlaced], LifecycleState::Persisted)?;
        file.state = LifecycleState::Persisted;

        let record = &file.record;
        if record.is_folder {
            return Ok(());
        }
        if let Some((doctype, name)) = record.attachment_owner() {
            let note = AttachmentNote {
                file_name: record.display_name().unwrap_or_default().to_string(),
                file_url: record.url().unwrap_or_default().to_string(),
                is_private: record.is_private,
                added_at: Utc::now(),
            };
            if let Err(e) = self.host.add_attachment_note(doctype, name, note).await {
                tracing::warn!(
                    error = %e,
                    doctype = %doctype,
                    name = %name,
                    "Failed to add attachment note"
                );
            }
        }
        Ok(())
    }

    /// Undo what this record wrote when the surrounding transaction rolls
    /// back. Only files written by this record are removed; failures are
    /// logged.
    #[tracing::instrument(skip(self, file), fields(state = %file.state))]
    pub async fn rollback(&self, file: &mut TrackedFile) -> FileResult<()> {
        file.expect_state(
            &[
                LifecycleState::New,
                LifecycleState::Validated,
                LifecycleState::ContentPlaced,
                LifecycleState::Persisted,
            ],
            LifecycleState::New,
        )?;

        for location in [file.local_write.take(), file.uploaded.take()]
            .into_iter()
            .flatten()
        {
            self.remove_unless_shared(&file.record, &location).await;
        }

        file.state = LifecycleState::New;
        Ok(())
    }

    /// Current content of the record.
    ///
    /// Inline content that has not been placed yet is returned directly;
    /// otherwise the bytes are read from the backend on every call.
    pub async fn content(&self, file: &TrackedFile) -> FileResult<FileContent> {
        let record = &file.record;
        if record.is_folder {
            return Err(FileError::FolderContentError(
                record.display_name().unwrap_or_default().to_string(),
            ));
        }

        if let Some(inline) = record.content.clone() {
            let decoded = record.content_encoding.decode(inline)?;
            return Ok(FileContent::classify(decoded));
        }

        self.dispatcher.read_content(record).await
    }

    /// `Persisted → Trashed`.
    ///
    /// Removes the backend object, and any local copy this record wrote,
    /// without ever failing the record deletion: storage errors are logged and
    /// swallowed. Bytes another record still references are kept. Trashing
    /// twice is a no-op.
    #[tracing::instrument(skip(self, file), fields(file_url = ?file.record.file_url))]
    pub async fn trash(&self, file: &mut TrackedFile) -> FileResult<()> {
        if file.state == LifecycleState::Trashed {
            return Ok(());
        }
        file.expect_state(
            &[LifecycleState::ContentPlaced, LifecycleState::Persisted],
            LifecycleState::Trashed,
        )?;

        let mut targets = Vec::new();
        match self.dispatcher.resolve(&file.record) {
            Ok(Some(location)) => targets.push(location),
            Ok(None) => {}
            Err(e) => tracing::warn!(
                error = %e,
                file_url = ?file.record.file_url,
                "Cannot resolve file; continuing with record deletion"
            ),
        }
        if let Some(location) = file.local_write.take() {
            if !targets.contains(&location) {
                targets.push(location);
            }
        }

        for location in &targets {
            self.remove_unless_shared(&file.record, location).await;
        }

        file.uploaded = None;
        file.state = LifecycleState::Trashed;
        Ok(())
    }

    /// Delete the bytes at `location` unless another record still points at
    /// them. Returns whether the location is gone; failures are logged.
    async fn remove_unless_shared(&self, record: &FileRecord, location: &ResolvedLocation) -> bool {
        if let ResolvedLocation::Remote { .. } = location {
            return true;
        }

        let file_url = location
            .local_url()
            .or_else(|| record.url().map(str::to_string));
        if let Some(file_url) = file_url {
            match self
                .host
                .count_file_references(&file_url, record.name.as_deref())
                .await
            {
                Ok(0) => {}
                Ok(references) => {
                    tracing::info!(
                        file_url = %file_url,
                        references,
                        "File is still referenced by other records; keeping stored bytes"
                    );
                    return false;
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        file_url = %file_url,
                        "Failed to count file references; keeping stored bytes"
                    );
                    return false;
                }
            }
        }

        match self.dispatcher.delete_location(location).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    backend = %location.backend(),
                    key = %location.key(),
                    "Failed to remove stored file"
                );
                false
            }
        }
    }
}

fn check_file_name(name: &str) -> FileResult<()> {
    if name.contains(['/', '\\']) {
        return Err(FileError::UnsafePath(format!(
            "File name cannot contain a path separator: {}",
            name
        )));
    }
    Ok(())
}

fn check_remote_url(raw: &str) -> FileResult<()> {
    let parsed = url::Url::parse(raw).map_err(|e| FileError::InvalidRemoteUrl(format!("{}: {}", raw, e)))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some_and(|h| !h.is_empty()) => Ok(()),
        _ => Err(FileError::InvalidRemoteUrl(raw.to_string())),
    }
}

fn last_segment(key: &str) -> Option<&str> {
    key.rsplit('/').find(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_url_must_be_absolute_http() {
        assert!(check_remote_url("https://example.com/img.png").is_ok());
        assert!(check_remote_url("http://example.com").is_ok());
        assert!(matches!(
            check_remote_url("not a url"),
            Err(FileError::InvalidRemoteUrl(_))
        ));
        assert!(matches!(
            check_remote_url("ftp://example.com/a"),
            Err(FileError::InvalidRemoteUrl(_))
        ));
        assert!(matches!(
            check_remote_url("/files/a.txt"),
            Err(FileError::InvalidRemoteUrl(_))
        ));
    }

    #[test]
    fn last_segment_skips_trailing_slash() {
        assert_eq!(last_segment("a/b/c.txt"), Some("c.txt"));
        assert_eq!(last_segment("a/b/"), Some("b"));
        assert_eq!(last_segment(""), None);
    }

    #[test]
    fn tracked_file_starts_new() {
        let file = TrackedFile::new(FileRecord::new("a.txt"));
        assert_eq!(file.state(), LifecycleState::New);
        assert!(file.local_write().is_none());

        let err = file
            .expect_state(&[LifecycleState::Persisted], LifecycleState::Trashed)
            .unwrap_err();
        assert!(matches!(
            err,
            FileError::InvalidTransition {
                from: "New",
                to: "Trashed"
            }
        ));
    }
}
