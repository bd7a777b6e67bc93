//! Test helpers: build a dispatcher over temporary roots and an in-memory
//! bucket, plus collaborator doubles.
//!
//! Run from workspace root: `cargo test -p attache-services`.

pub mod host;
pub mod storage;

use attache_core::AttachmentHost;
use attache_services::{CloudUploader, FileLifecycleController, LocalOnlyUploader, ObjectStoreUploader};
use attache_storage::StorageDispatcher;
use host::InMemoryAttachmentHost;
use std::sync::Arc;
use storage::TestStorage;

pub const SITE_URL: &str = "https://erp.example.com";
pub const SIGNED_ENDPOINT: &str = "/api/files/signed";
pub const BUCKET_URL: &str = "https://s3.region.amazonaws.com/mybucket/";

pub struct TestApp {
    pub storage: TestStorage,
    pub dispatcher: Arc<StorageDispatcher>,
    pub host: Arc<InMemoryAttachmentHost>,
}

impl TestApp {
    pub fn controller(&self, uploader: Arc<dyn CloudUploader>) -> FileLifecycleController {
        let host: Arc<dyn AttachmentHost> = self.host.clone();
        FileLifecycleController::new(self.dispatcher.clone(), uploader, host)
    }

    /// Controller that leaves files on local disk
    pub fn local_controller(&self) -> FileLifecycleController {
        self.controller(Arc::new(LocalOnlyUploader))
    }

    /// Controller that pushes files to the in-memory bucket
    pub fn bucket_controller(&self) -> FileLifecycleController {
        self.controller(Arc::new(ObjectStoreUploader::new(
            self.dispatcher.clone(),
            "attachments",
        )))
    }
}

pub async fn setup_test_app() -> TestApp {
    let storage = TestStorage::new();
    let dispatcher = Arc::new(storage.dispatcher().await);
    TestApp {
        storage,
        dispatcher,
        host: Arc::new(InMemoryAttachmentHost::default()),
    }
}
