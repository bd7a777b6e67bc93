//! Attache Services Layer
//!
//! Orchestration on top of the storage crate: the file record lifecycle and
//! the cloud upload step that follows local placement. The hosting framework
//! calls [`FileLifecycleController`] from its document hooks and implements
//! [`attache_core::AttachmentHost`] for the owning records.

pub mod cloud;
pub mod factory;
pub mod lifecycle;

pub use attache_storage::{create_dispatcher, StorageDispatcher, StorageError, StorageResult};
pub use cloud::{BackendHint, CloudUploader, LocalOnlyUploader, ObjectStoreUploader};
pub use factory::create_controller;
pub use lifecycle::{FileLifecycleController, LifecycleState, TrackedFile};
