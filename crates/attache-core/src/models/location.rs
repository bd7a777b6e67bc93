//! Resolved location model: the backend-tagged outcome of resolving a stored
//! file reference.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::storage_types::StorageBackend;

/// Which of the two local file trees a `Local` location lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalRoot {
    Public,
    Private,
}

impl LocalRoot {
    pub fn for_private(is_private: bool) -> Self {
        if is_private {
            LocalRoot::Private
        } else {
            LocalRoot::Public
        }
    }

    /// URL prefix under which files of this root are addressed.
    pub fn url_prefix(&self) -> &'static str {
        match self {
            LocalRoot::Public => "/files/",
            LocalRoot::Private => "/private/files/",
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, LocalRoot::Private)
    }
}

/// Where a file's bytes live.
///
/// Keys never contain `..` segments and never carry their backend prefix
/// (`/files/`, the bucket URL, the signed endpoint path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum ResolvedLocation {
    /// A file under one of the local roots; `key` is relative to that root.
    Local { root: LocalRoot, key: String },
    /// An object in the configured bucket.
    ObjectStore { key: String },
    /// An object in the configured bucket addressed through the signed
    /// retrieval endpoint.
    SignedEndpoint { key: String },
    /// An external URL this system does not own.
    Remote { url: String },
}

impl ResolvedLocation {
    pub fn backend(&self) -> StorageBackend {
        match self {
            ResolvedLocation::Local { .. } => StorageBackend::Local,
            ResolvedLocation::ObjectStore { .. } => StorageBackend::ObjectStore,
            ResolvedLocation::SignedEndpoint { .. } => StorageBackend::SignedEndpoint,
            ResolvedLocation::Remote { .. } => StorageBackend::Remote,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            ResolvedLocation::Local { key, .. }
            | ResolvedLocation::ObjectStore { key }
            | ResolvedLocation::SignedEndpoint { key } => key,
            ResolvedLocation::Remote { url } => url,
        }
    }

    /// Key as it should be looked up in the bucket, if the bytes are in it.
    pub fn object_key(&self) -> Option<&str> {
        match self {
            ResolvedLocation::ObjectStore { key } | ResolvedLocation::SignedEndpoint { key } => {
                Some(key)
            }
            _ => None,
        }
    }

    /// Relative filesystem path for a local location.
    pub fn relative_path(&self) -> Option<PathBuf> {
        match self {
            ResolvedLocation::Local { key, .. } => Some(key.split('/').collect()),
            _ => None,
        }
    }

    /// The site-relative URL a local location is served under.
    pub fn local_url(&self) -> Option<String> {
        match self {
            ResolvedLocation::Local { root, key } => Some(format!("{}{}", root.url_prefix(), key)),
            _ => None,
        }
    }
}
