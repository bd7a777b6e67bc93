use crate::{LocalStorage, ObjectStorage, PathResolver, StorageDispatcher};
use crate::{StorageError, StorageResult};
use attache_core::{ObjectStoreBackend, StorageConfig};
use std::time::Duration;

/// Create the bucket adapter described by configuration, if any
pub fn create_object_storage(config: &StorageConfig) -> StorageResult<Option<ObjectStorage>> {
    let bucket = || {
        config
            .s3_bucket
            .clone()
            .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))
    };
    let public_url_prefix = || {
        config.bucket_url_prefix().ok_or_else(|| {
            StorageError::ConfigError("S3_REGION or S3_ENDPOINT not configured".to_string())
        })
    };

    match config.object_store_backend {
        #[cfg(feature = "storage-s3")]
        ObjectStoreBackend::S3 => {
            let region = config.s3_region.clone().ok_or_else(|| {
                StorageError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
            })?;
            let storage = ObjectStorage::s3(
                bucket()?,
                region,
                config.s3_endpoint.clone(),
                public_url_prefix()?,
            )?;
            Ok(Some(storage))
        }

        #[cfg(not(feature = "storage-s3"))]
        ObjectStoreBackend::S3 => Err(StorageError::ConfigError(
            "S3 object store not available (storage-s3 feature not enabled)".to_string(),
        )),

        ObjectStoreBackend::Memory => {
            let bucket = bucket()?;
            let prefix = config
                .bucket_url_prefix()
                .unwrap_or_else(|| format!("memory://{}/", bucket));
            Ok(Some(ObjectStorage::in_memory(bucket, prefix)))
        }

        ObjectStoreBackend::None => Ok(None),
    }
}

/// Create a dispatcher over the local roots and bucket described by configuration
pub async fn create_dispatcher(config: &StorageConfig) -> StorageResult<StorageDispatcher> {
    let public = LocalStorage::new(&config.public_files_path).await?;
    let private = LocalStorage::new(&config.private_files_path).await?;
    let objects = create_object_storage(config)?;

    let mut resolver = PathResolver::from_config(config);
    if let (Some(objects), None) = (objects.as_ref(), config.bucket_url_prefix()) {
        resolver = resolver.with_bucket_url_prefix(objects.public_url_prefix());
    }

    tracing::info!(
        public = %config.public_files_path.display(),
        private = %config.private_files_path.display(),
        object_store = %config.object_store_backend,
        bucket = ?config.s3_bucket,
        "Storage dispatcher configured"
    );

    Ok(
        StorageDispatcher::new(resolver, public, private, objects)
            .with_presign_expiry(Duration::from_secs(config.presigned_url_expiry_secs)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use attache_core::{FileRecord, ResolvedLocation};
    use bytes::Bytes;
    use tempfile::tempdir;

    #[tokio::test]
    async fn local_only_dispatcher() {
        let dir = tempdir().unwrap();
        let config = StorageConfig::local(
            "http://localhost:8000",
            dir.path().join("public"),
            dir.path().join("private"),
        );

        let dispatcher = create_dispatcher(&config).await.unwrap();
        assert!(dispatcher.object_storage().is_none());
        assert!(dir.path().join("public").is_dir());
        assert!(dir.path().join("private").is_dir());
    }

    #[tokio::test]
    async fn memory_bucket_without_region_uses_memory_urls() {
        let dir = tempdir().unwrap();
        let mut config = StorageConfig::local(
            "http://localhost:8000",
            dir.path().join("public"),
            dir.path().join("private"),
        );
        config.object_store_backend = ObjectStoreBackend::Memory;
        config.s3_bucket = Some("dev".to_string());

        let dispatcher = create_dispatcher(&config).await.unwrap();
        dispatcher
            .put_object("a.txt", Bytes::from_static(b"hi"))
            .await
            .unwrap();

        let record = FileRecord::from_url("memory://dev/a.txt");
        assert_eq!(
            dispatcher.resolve(&record).unwrap(),
            Some(ResolvedLocation::ObjectStore {
                key: "a.txt".to_string()
            })
        );
        assert_eq!(
            dispatcher.read_content(&record).await.unwrap().as_text(),
            Some("hi")
        );
    }

    #[test]
    fn memory_bucket_requires_name() {
        let mut config = StorageConfig::local("http://localhost:8000", "/tmp/a", "/tmp/b");
        config.object_store_backend = ObjectStoreBackend::Memory;
        assert!(matches!(
            create_object_storage(&config),
            Err(StorageError::ConfigError(_))
        ));
    }
}
