use crate::cloud::{CloudUploader, LocalOnlyUploader, ObjectStoreUploader};
use crate::lifecycle::FileLifecycleController;
use attache_core::{AttachmentHost, FileResult, StorageConfig};
use attache_storage::create_dispatcher;
use std::sync::Arc;

/// Build a lifecycle controller from configuration.
///
/// Files are pushed to the bucket when one is configured and stay on local
/// disk otherwise.
pub async fn create_controller(
    config: &StorageConfig,
    host: Arc<dyn AttachmentHost>,
) -> FileResult<FileLifecycleController> {
    let dispatcher = Arc::new(create_dispatcher(config).await?);

    let uploader: Arc<dyn CloudUploader> = if dispatcher.object_storage().is_some() {
        Arc::new(ObjectStoreUploader::new(
            dispatcher.clone(),
            config.object_key_prefix.clone(),
        ))
    } else {
        Arc::new(LocalOnlyUploader)
    };

    Ok(FileLifecycleController::new(dispatcher, uploader, host)
        .with_max_attachments(config.max_attachments)
        .with_delete_local_after_upload(config.delete_local_after_upload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{LifecycleState, TrackedFile};
    use attache_core::{FileRecord, NoOpAttachmentHost, ObjectStoreBackend};
    use tempfile::tempdir;

    #[tokio::test]
    async fn memory_bucket_controller_uploads() {
        let dir = tempdir().unwrap();
        let mut config = StorageConfig::local(
            "http://localhost:8000",
            dir.path().join("public"),
            dir.path().join("private"),
        );
        config.object_store_backend = ObjectStoreBackend::Memory;
        config.s3_bucket = Some("dev".to_string());

        let controller = create_controller(&config, Arc::new(NoOpAttachmentHost))
            .await
            .unwrap();

        let mut file = TrackedFile::new(FileRecord::new("a.txt").with_content("hello"));
        controller.before_insert(&mut file).await.unwrap();
        assert_eq!(file.state(), LifecycleState::ContentPlaced);

        let url = file.record.file_url.clone().unwrap();
        assert!(url.starts_with("memory://dev/attachments/"), "{}", url);
        assert!(!dir.path().join("public").join("a.txt").exists());
        assert_eq!(
            controller.content(&file).await.unwrap().as_text(),
            Some("hello")
        );
    }

    #[tokio::test]
    async fn local_controller_keeps_files_on_disk() {
        let dir = tempdir().unwrap();
        let config = StorageConfig::local(
            "http://localhost:8000",
            dir.path().join("public"),
            dir.path().join("private"),
        );

        let controller = create_controller(&config, Arc::new(NoOpAttachmentHost))
            .await
            .unwrap();

        let mut file = TrackedFile::new(FileRecord::new("a.txt").with_content("hello"));
        controller.before_insert(&mut file).await.unwrap();
        assert_eq!(file.record.file_url.as_deref(), Some("/files/a.txt"));
        assert!(dir.path().join("public").join("a.txt").exists());
    }
}
