use async_trait::async_trait;
use attache_core::{AttachmentHost, AttachmentNote, FileRecord};
use std::collections::HashMap;
use std::sync::Mutex;

/// Attachment bookkeeping held in memory.
#[derive(Default)]
pub struct InMemoryAttachmentHost {
    counts: Mutex<HashMap<(String, String), usize>>,
    notes: Mutex<Vec<(String, String, AttachmentNote)>>,
    /// `(name, file_url)` of committed file records
    files: Mutex<Vec<(Option<String>, String)>>,
    fail_notes: bool,
}

impl InMemoryAttachmentHost {
    /// Host whose note writes always fail
    pub fn failing_notes() -> Self {
        Self {
            fail_notes: true,
            ..Default::default()
        }
    }

    pub fn set_count(&self, doctype: &str, name: &str, count: usize) {
        self.counts
            .lock()
            .unwrap()
            .insert((doctype.to_string(), name.to_string()), count);
    }

    /// Record a committed file row, as the document store would.
    pub fn store_record(&self, record: &FileRecord) {
        if let Some(url) = record.url() {
            self.files
                .lock()
                .unwrap()
                .push((record.name.clone(), url.to_string()));
        }
    }

    pub fn remove_record(&self, record: &FileRecord) {
        self.files
            .lock()
            .unwrap()
            .retain(|(name, _)| *name != record.name);
    }

    pub fn notes(&self) -> Vec<(String, String, AttachmentNote)> {
        self.notes.lock().unwrap().clone()
    }
}

#[async_trait]
impl AttachmentHost for InMemoryAttachmentHost {
    async fn attachment_count(&self, doctype: &str, name: &str) -> Result<usize, String> {
        Ok(self
            .counts
            .lock()
            .unwrap()
            .get(&(doctype.to_string(), name.to_string()))
            .copied()
            .unwrap_or(0))
    }

    async fn add_attachment_note(
        &self,
        doctype: &str,
        name: &str,
        note: AttachmentNote,
    ) -> Result<(), String> {
        if self.fail_notes {
            return Err("note table locked".to_string());
        }
        self.notes
            .lock()
            .unwrap()
            .push((doctype.to_string(), name.to_string(), note));
        Ok(())
    }

    async fn count_file_references(
        &self,
        file_url: &str,
        exclude_name: Option<&str>,
    ) -> Result<usize, String> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, url)| url == file_url && name.as_deref() != exclude_name)
            .count())
    }
}
