//! File content as handed back to callers.
//!
//! Reads classify bytes on a best-effort basis: valid UTF-8 comes back as
//! text, anything else as raw bytes. This is not a format decision; a binary
//! file that happens to be valid UTF-8 is returned as text.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;

use crate::error::{FileError, FileResult};

/// Transport encoding of inline content supplied on creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentEncoding {
    #[default]
    Raw,
    /// Base64, optionally wrapped in a `data:<mime>;base64,` URL
    Base64,
}

impl ContentEncoding {
    pub fn decode(&self, content: Bytes) -> FileResult<Bytes> {
        match self {
            ContentEncoding::Raw => Ok(content),
            ContentEncoding::Base64 => decode_base64_content(&content),
        }
    }
}

fn decode_base64_content(content: &[u8]) -> FileResult<Bytes> {
    let mut payload = content;
    if payload.starts_with(b"data:") {
        if let Some(comma) = payload.iter().position(|b| *b == b',') {
            payload = &payload[comma + 1..];
        }
    }
    let trimmed: Vec<u8> = payload
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    STANDARD
        .decode(trimmed)
        .map(Bytes::from)
        .map_err(|e| FileError::InvalidInput(format!("Content is not valid base64: {}", e)))
}

/// Content read from a backend: text if decodable, else binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(String),
    Binary(Bytes),
}

impl FileContent {
    pub fn classify(raw: Bytes) -> Self {
        match std::str::from_utf8(&raw) {
            Ok(text) => FileContent::Text(text.to_string()),
            Err(_) => FileContent::Binary(raw),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FileContent::Text(text) => Some(text),
            FileContent::Binary(_) => None,
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, FileContent::Binary(_))
    }

    pub fn len(&self) -> usize {
        match self {
            FileContent::Text(text) => text.len(),
            FileContent::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            FileContent::Text(text) => Bytes::from(text),
            FileContent::Binary(bytes) => bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_text_and_binary() {
        let text = FileContent::classify(Bytes::from_static(b"hello"));
        assert_eq!(text.as_text(), Some("hello"));

        let png = FileContent::classify(Bytes::from_static(&[0x89, b'P', b'N', b'G', 0xff]));
        assert!(png.is_binary());
        assert_eq!(png.len(), 5);
        assert_eq!(
            png.into_bytes(),
            Bytes::from_static(&[0x89, b'P', b'N', b'G', 0xff])
        );
    }

    #[test]
    fn decodes_plain_base64() {
        let decoded = ContentEncoding::Base64
            .decode(Bytes::from_static(b"aGVsbG8="))
            .unwrap();
        assert_eq!(decoded, Bytes::from_static(b"hello"));
    }

    #[test]
    fn decodes_data_url() {
        let decoded = ContentEncoding::Base64
            .decode(Bytes::from_static(b"data:text/plain;base64,aGVs\nbG8="))
            .unwrap();
        assert_eq!(decoded, Bytes::from_static(b"hello"));
    }

    #[test]
    fn raw_passes_through() {
        let decoded = ContentEncoding::Raw
            .decode(Bytes::from_static(b"aGVsbG8="))
            .unwrap();
        assert_eq!(decoded, Bytes::from_static(b"aGVsbG8="));
    }

    #[test]
    fn rejects_invalid_base64() {
        let err = ContentEncoding::Base64
            .decode(Bytes::from_static(b"not base64!"))
            .unwrap_err();
        assert!(matches!(err, FileError::InvalidInput(_)));
    }
}
