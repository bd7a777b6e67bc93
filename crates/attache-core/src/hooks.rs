//! Hooks and traits for the owning document framework
//!
//! File records are attachments of other records. The core never talks to the
//! framework's data store directly; it goes through these narrow interfaces,
//! which the hosting application implements.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Audit note appended to the owning record after an attachment is created.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AttachmentNote {
    pub file_name: String,
    pub file_url: String,
    pub is_private: bool,
    pub added_at: DateTime<Utc>,
}

impl AttachmentNote {
    /// Human-readable summary, e.g. `Added report.pdf (private)`.
    pub fn summary(&self) -> String {
        if self.is_private {
            format!("Added {} (private)", self.file_name)
        } else {
            format!("Added {}", self.file_name)
        }
    }
}

/// Read/write interface to the record a file is attached to.
#[async_trait]
pub trait AttachmentHost: Send + Sync {
    /// Current number of attachments of `doctype`/`name`
    async fn attachment_count(&self, doctype: &str, name: &str) -> Result<usize, String>;

    /// Append an audit note to `doctype`/`name`
    async fn add_attachment_note(
        &self,
        doctype: &str,
        name: &str,
        note: AttachmentNote,
    ) -> Result<(), String>;

    /// Number of file records other than `exclude_name` whose `file_url` is
    /// `file_url`. Stored bytes are only deleted when this is zero.
    async fn count_file_references(
        &self,
        file_url: &str,
        exclude_name: Option<&str>,
    ) -> Result<usize, String>;
}

/// No-op implementation for hosts without attachment bookkeeping
pub struct NoOpAttachmentHost;

#[async_trait]
impl AttachmentHost for NoOpAttachmentHost {
    async fn attachment_count(&self, _doctype: &str, _name: &str) -> Result<usize, String> {
        Ok(0)
    }

    async fn add_attachment_note(
        &self,
        _doctype: &str,
        _name: &str,
        _note: AttachmentNote,
    ) -> Result<(), String> {
        Ok(())
    }

    async fn count_file_references(
        &self,
        _file_url: &str,
        _exclude_name: Option<&str>,
    ) -> Result<usize, String> {
        Ok(0)
    }
}
