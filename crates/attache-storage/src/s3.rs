use crate::traits::{BlobStore, StorageError, StorageResult};
use async_trait::async_trait;
use attache_core::StorageBackend;
use bytes::Bytes;
use http::Method;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStoreExt, PutPayload, Result as ObjectResult};
use std::sync::Arc;
use std::time::Duration;

/// Adapter over the single bucket this system owns
///
/// Wraps any `object_store` implementation: AWS S3 (or an S3-compatible
/// provider) in production, `InMemory` in development and tests.
#[derive(Clone)]
pub struct ObjectStorage {
    store: Arc<dyn object_store::ObjectStore>,
    signer: Option<Arc<dyn Signer>>,
    bucket: String,
    /// `https://<store-host>/<bucket>/`
    public_url_prefix: String,
}

impl std::fmt::Debug for ObjectStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStorage")
            .field("bucket", &self.bucket)
            .field("public_url_prefix", &self.public_url_prefix)
            .field("signing", &self.signer.is_some())
            .finish()
    }
}

impl ObjectStorage {
    pub fn new(
        store: Arc<dyn object_store::ObjectStore>,
        bucket: impl Into<String>,
        public_url_prefix: impl Into<String>,
    ) -> Self {
        let mut public_url_prefix = public_url_prefix.into();
        if !public_url_prefix.ends_with('/') {
            public_url_prefix.push('/');
        }

        ObjectStorage {
            store,
            signer: None,
            bucket: bucket.into(),
            public_url_prefix,
        }
    }

    /// Process-local bucket; contents vanish with the process.
    pub fn in_memory(bucket: impl Into<String>, public_url_prefix: impl Into<String>) -> Self {
        Self::new(Arc::new(InMemory::new()), bucket, public_url_prefix)
    }

    /// Create an S3-backed instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    /// * `public_url_prefix` - URL prefix objects of this bucket are addressed by
    #[cfg(feature = "storage-s3")]
    pub fn s3(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        public_url_prefix: String,
    ) -> StorageResult<Self> {
        use object_store::aws::AmazonS3Builder;

        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = Arc::new(
            builder
                .build()
                .map_err(|e| StorageError::ConfigError(e.to_string()))?,
        );

        Ok(Self::new(store.clone(), bucket, public_url_prefix).with_signer(store))
    }

    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn public_url_prefix(&self) -> &str {
        &self.public_url_prefix
    }

    /// Public URL of an object: `https://<store-host>/<bucket>/<key>`
    pub fn object_url(&self, key: &str) -> String {
        format!("{}{}", self.public_url_prefix, key)
    }

    /// Time-limited GET URL for an object
    pub async fn presigned_url(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            StorageError::ConfigError(format!(
                "Bucket {} does not support presigned URLs",
                self.bucket
            ))
        })?;

        let location = Path::from(key.to_string());
        let url_result: ObjectResult<_> = signer
            .signed_url(Method::GET, &location, expires_in)
            .await;

        let url = url_result
            .map_err(|e| StorageError::BackendError(e.to_string()))?
            .to_string();

        Ok(url)
    }
}

#[async_trait]
impl BlobStore for ObjectStorage {
    async fn get(&self, storage_key: &str) -> StorageResult<Bytes> {
        let start = std::time::Instant::now();
        let location = Path::from(storage_key.to_string());

        let result: ObjectResult<_> = self.store.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(storage_key.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %storage_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Object store download failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::debug!(
            bucket = %self.bucket,
            key = %storage_key,
            size_bytes = bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object store download successful"
        );

        Ok(bytes)
    }

    async fn put(&self, storage_key: &str, data: Bytes) -> StorageResult<()> {
        let size = data.len() as u64;
        let location = Path::from(storage_key.to_string());
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self.store.put(&location, PutPayload::from(data)).await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %storage_key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Object store upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object store upload successful"
        );

        Ok(())
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let location = Path::from(storage_key.to_string());

        let result: ObjectResult<_> = self.store.delete(&location).await;

        match result {
            Ok(_) | Err(ObjectStoreError::NotFound { .. }) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Object store delete failed"
                );
                return Err(StorageError::DeleteFailed(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object store delete successful"
        );

        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let location = Path::from(storage_key.to_string());
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::ObjectStore
    }
}
