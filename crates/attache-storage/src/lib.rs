//! Attache Storage Library
//!
//! Storage resolution and dispatch for file attachments that may live on local
//! disk or in an S3-compatible bucket.
//!
//! - [`PathResolver`] turns a stored reference into a [`ResolvedLocation`]
//!   without any I/O.
//! - [`LocalStorage`] and [`ObjectStorage`] are thin adapters over the local
//!   file trees and the bucket.
//! - [`StorageDispatcher`] routes reads, writes and deletes to the right
//!   adapter for a resolved location.
//!
//! # Reference shapes
//!
//! - `/files/<path>` and `/private/files/<path>` (optionally prefixed with the
//!   site URL) or a bare file name: local disk
//! - `https://<store-host>/<bucket>/<key>`: the configured bucket
//! - `<signed-endpoint-path>?key=<key>`: the configured bucket, behind the
//!   signed retrieval endpoint
//! - any other `http(s)://` URL: remote, never fetched or deleted

pub mod dispatcher;
pub mod factory;
pub mod keys;
pub mod local;
pub mod resolver;
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use attache_core::{FileContent, FileRecord, ResolvedLocation, StorageBackend};
pub use dispatcher::StorageDispatcher;
pub use factory::create_dispatcher;
pub use local::LocalStorage;
pub use resolver::PathResolver;
pub use s3::ObjectStorage;
pub use traits::{BlobStore, StorageError, StorageResult};
