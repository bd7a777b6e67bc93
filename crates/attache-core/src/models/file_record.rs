use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::content::ContentEncoding;

pub const HOME_FOLDER: &str = "Home";
pub const ATTACHMENTS_FOLDER: &str = "Home/Attachments";

/// One attachment as stored by the document framework.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    /// Unique identifier, generated on validation when absent
    pub name: Option<String>,
    /// Display name; never contains a path separator
    pub file_name: Option<String>,
    pub file_url: Option<String>,
    pub is_private: bool,
    pub is_folder: bool,
    pub is_remote_file: bool,
    pub folder: Option<String>,
    pub attached_to_doctype: Option<String>,
    pub attached_to_name: Option<String>,
    pub file_size: Option<u64>,
    /// Hex SHA-256 of the stored bytes
    pub content_hash: Option<String>,
    /// Inline content, only present on the create path
    #[serde(skip)]
    pub content: Option<Bytes>,
    /// How `content` is transport-encoded
    #[serde(skip)]
    pub content_encoding: ContentEncoding,
}

impl FileRecord {
    pub fn new(file_name: impl Into<String>) -> Self {
        FileRecord {
            file_name: Some(file_name.into()),
            ..Default::default()
        }
    }

    pub fn from_url(file_url: impl Into<String>) -> Self {
        FileRecord {
            file_url: Some(file_url.into()),
            ..Default::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<Bytes>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_encoding(mut self, encoding: ContentEncoding) -> Self {
        self.content_encoding = encoding;
        self
    }

    pub fn private(mut self, is_private: bool) -> Self {
        self.is_private = is_private;
        self
    }

    pub fn remote(mut self) -> Self {
        self.is_remote_file = true;
        self
    }

    pub fn folder(mut self) -> Self {
        self.is_folder = true;
        self
    }

    pub fn attached_to(mut self, doctype: impl Into<String>, name: impl Into<String>) -> Self {
        self.attached_to_doctype = Some(doctype.into());
        self.attached_to_name = Some(name.into());
        self
    }

    /// `file_url`, treating an empty string as absent.
    pub fn url(&self) -> Option<&str> {
        self.file_url.as_deref().filter(|u| !u.is_empty())
    }

    /// `file_name`, treating an empty string as absent.
    pub fn display_name(&self) -> Option<&str> {
        self.file_name.as_deref().filter(|n| !n.is_empty())
    }

    /// The stored reference: the URL when present, else the bare file name.
    pub fn reference(&self) -> Option<&str> {
        self.url().or_else(|| self.display_name())
    }

    /// The owning record, when both halves of the link are set.
    pub fn attachment_owner(&self) -> Option<(&str, &str)> {
        match (
            self.attached_to_doctype.as_deref().filter(|d| !d.is_empty()),
            self.attached_to_name.as_deref().filter(|n| !n.is_empty()),
        ) {
            (Some(doctype), Some(name)) => Some((doctype, name)),
            _ => None,
        }
    }

    pub fn has_inline_content(&self) -> bool {
        self.content.is_some()
    }

    pub fn ensure_name(&mut self) -> &str {
        self.name
            .get_or_insert_with(|| Uuid::new_v4().simple().to_string())
            .as_str()
    }

    /// Folder this file is filed under when the caller did not choose one.
    pub fn default_folder(&self) -> &'static str {
        if self.attachment_owner().is_some() {
            ATTACHMENTS_FOLDER
        } else {
            HOME_FOLDER
        }
    }
}
