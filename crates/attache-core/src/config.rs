//! Configuration module
//!
//! Storage roots, bucket account and signed endpoint settings, loaded from the
//! environment (and a `.env` file when present).

use std::env;
use std::path::PathBuf;

use crate::storage_types::ObjectStoreBackend;

const SITE_URL: &str = "http://localhost:8000";
const PUBLIC_FILES_PATH: &str = "./sites/public/files";
const PRIVATE_FILES_PATH: &str = "./sites/private/files";
const SIGNED_ENDPOINT_PATH: &str = "/api/files/signed";
const PRESIGNED_URL_EXPIRY_SECS: u64 = 120;
const OBJECT_KEY_PREFIX: &str = "attachments";

#[derive(Clone, Debug)]
pub struct StorageConfig {
    /// Base URL of the site; stripped from same-site absolute file URLs
    pub site_url: String,
    pub public_files_path: PathBuf,
    pub private_files_path: PathBuf,
    pub object_store_backend: ObjectStoreBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO, DigitalOcean Spaces, etc.)
    pub s3_endpoint: Option<String>,
    /// Path of the signed retrieval endpoint, without query string
    pub signed_endpoint_path: String,
    pub presigned_url_expiry_secs: u64,
    /// Maximum number of attachments per owning record; `None` is unlimited
    pub max_attachments: Option<usize>,
    pub object_key_prefix: String,
    pub delete_local_after_upload: bool,
}

impl StorageConfig {
    /// Configuration for a site whose files stay on local disk.
    pub fn local(
        site_url: impl Into<String>,
        public_files_path: impl Into<PathBuf>,
        private_files_path: impl Into<PathBuf>,
    ) -> Self {
        StorageConfig {
            site_url: site_url.into(),
            public_files_path: public_files_path.into(),
            private_files_path: private_files_path.into(),
            object_store_backend: ObjectStoreBackend::None,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            signed_endpoint_path: SIGNED_ENDPOINT_PATH.to_string(),
            presigned_url_expiry_secs: PRESIGNED_URL_EXPIRY_SECS,
            max_attachments: None,
            object_key_prefix: OBJECT_KEY_PREFIX.to_string(),
            delete_local_after_upload: true,
        }
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source; `from_env` uses the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let object_store_backend = match var("OBJECT_STORE_BACKEND") {
            Some(value) => value.parse()?,
            None => ObjectStoreBackend::S3,
        };

        let max_attachments = match var("MAX_ATTACHMENTS") {
            Some(value) => Some(
                value
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| anyhow::anyhow!("MAX_ATTACHMENTS must be a valid number"))?,
            ),
            None => None,
        };

        let config = StorageConfig {
            site_url: var("SITE_URL").unwrap_or_else(|| SITE_URL.to_string()),
            public_files_path: var("PUBLIC_FILES_PATH")
                .unwrap_or_else(|| PUBLIC_FILES_PATH.to_string())
                .into(),
            private_files_path: var("PRIVATE_FILES_PATH")
                .unwrap_or_else(|| PRIVATE_FILES_PATH.to_string())
                .into(),
            object_store_backend,
            s3_bucket: var("S3_BUCKET"),
            s3_region: var("S3_REGION").or_else(|| var("AWS_REGION")),
            s3_endpoint: var("S3_ENDPOINT"),
            signed_endpoint_path: var("SIGNED_ENDPOINT_PATH")
                .unwrap_or_else(|| SIGNED_ENDPOINT_PATH.to_string()),
            presigned_url_expiry_secs: var("PRESIGNED_URL_EXPIRY_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(PRESIGNED_URL_EXPIRY_SECS),
            max_attachments,
            object_key_prefix: var("OBJECT_KEY_PREFIX")
                .unwrap_or_else(|| OBJECT_KEY_PREFIX.to_string()),
            delete_local_after_upload: var("DELETE_LOCAL_AFTER_UPLOAD")
                .unwrap_or_else(|| "true".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let site = url::Url::parse(&self.site_url)
            .map_err(|e| anyhow::anyhow!("SITE_URL must be an absolute URL: {}", e))?;
        if !matches!(site.scheme(), "http" | "https") {
            return Err(anyhow::anyhow!("SITE_URL must use http or https"));
        }

        if !self.signed_endpoint_path.starts_with('/') {
            return Err(anyhow::anyhow!("SIGNED_ENDPOINT_PATH must start with '/'"));
        }

        if self.public_files_path == self.private_files_path {
            return Err(anyhow::anyhow!(
                "PUBLIC_FILES_PATH and PRIVATE_FILES_PATH must be different directories"
            ));
        }

        match self.object_store_backend {
            ObjectStoreBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using the s3 object store backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using the s3 object store backend"
                    ));
                }
            }
            ObjectStoreBackend::Memory => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set to name the in-memory bucket"
                    ));
                }
            }
            ObjectStoreBackend::None => {}
        }

        Ok(())
    }

    pub fn has_object_store(&self) -> bool {
        self.object_store_backend != ObjectStoreBackend::None
    }

    /// Public URL prefix of the bucket, ending in `/`.
    ///
    /// `{endpoint}/{bucket}/` for S3-compatible providers, otherwise
    /// `https://s3.{region}.amazonaws.com/{bucket}/`.
    pub fn bucket_url_prefix(&self) -> Option<String> {
        let bucket = self.s3_bucket.as_deref()?;
        match (self.s3_endpoint.as_deref(), self.s3_region.as_deref()) {
            (Some(endpoint), _) => Some(format!("{}/{}/", endpoint.trim_end_matches('/'), bucket)),
            (None, Some(region)) => Some(format!("https://s3.{}.amazonaws.com/{}/", region, bucket)),
            (None, None) => None,
        }
    }
}
