use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Backend tags a file reference can resolve to.
///
/// Exactly one tag is attached to every [`crate::ResolvedLocation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Local,
    ObjectStore,
    SignedEndpoint,
    Remote,
}

impl StorageBackend {
    /// Whether bytes behind this backend are owned (and therefore readable and
    /// deletable) by this system.
    pub fn is_managed(&self) -> bool {
        !matches!(self, StorageBackend::Remote)
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::Local => write!(f, "local"),
            StorageBackend::ObjectStore => write!(f, "object_store"),
            StorageBackend::SignedEndpoint => write!(f, "signed_endpoint"),
            StorageBackend::Remote => write!(f, "remote"),
        }
    }
}

/// Which object store implementation backs the configured bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectStoreBackend {
    S3,
    /// Process-local in-memory bucket (development and tests).
    Memory,
    /// No bucket; every file stays on local disk.
    None,
}

impl FromStr for ObjectStoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s3" => Ok(ObjectStoreBackend::S3),
            "memory" => Ok(ObjectStoreBackend::Memory),
            "none" | "" => Ok(ObjectStoreBackend::None),
            _ => Err(anyhow::anyhow!("Invalid object store backend: {}", s)),
        }
    }
}

impl Display for ObjectStoreBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ObjectStoreBackend::S3 => write!(f, "s3"),
            ObjectStoreBackend::Memory => write!(f, "memory"),
            ObjectStoreBackend::None => write!(f, "none"),
        }
    }
}
