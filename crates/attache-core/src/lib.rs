//! Attache Core Library
//!
//! This crate provides the domain model, error taxonomy, configuration and
//! collaborator interfaces shared by every Attache component.

pub mod config;
pub mod error;
pub mod hooks;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::StorageConfig;
pub use error::{ErrorMetadata, FileError, FileResult, LogLevel};
pub use hooks::{AttachmentHost, AttachmentNote, NoOpAttachmentHost};
pub use models::{ContentEncoding, FileContent, FileRecord, LocalRoot, ResolvedLocation};
pub use storage_types::{ObjectStoreBackend, StorageBackend};
