//! Shared key generation for storage backends.
//!
//! Object keys are scoped by the owning record:
//! `{prefix}/{doctype}/{docname}/{name}_{file_name}`, or
//! `{prefix}/{name}_{file_name}` for unattached files. Keys never contain `..`
//! or a leading `/`.

use attache_core::FileRecord;
use sha2::{Digest, Sha256};

/// Replace anything that could split or escape a key segment.
fn sanitize_segment(segment: &str) -> String {
    let cleaned: String = segment
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' | '?' | '#' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned.replace("..", "_"),
    }
}

/// Generate the bucket key a record's bytes are uploaded under.
pub fn generate_object_key(prefix: &str, record: &FileRecord) -> String {
    let file_name = sanitize_segment(record.display_name().unwrap_or("file"));
    let leaf = match record.name.as_deref().filter(|n| !n.is_empty()) {
        Some(name) => format!("{}_{}", sanitize_segment(name), file_name),
        None => file_name,
    };

    let mut segments: Vec<String> = prefix
        .split('/')
        .filter(|s| !s.is_empty())
        .map(sanitize_segment)
        .collect();
    if let Some((doctype, docname)) = record.attachment_owner() {
        segments.push(sanitize_segment(doctype));
        segments.push(sanitize_segment(docname));
    }
    segments.push(leaf);
    segments.join("/")
}

/// Hex SHA-256 of `data`.
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// `report.txt` + hash → `report3f2a1c.txt`, used when a different file
/// already occupies the target name.
pub fn hashed_file_name(file_name: &str, hash: &str) -> String {
    let suffix = &hash[..hash.len().min(6)];
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}{}.{}", stem, suffix, ext),
        _ => format!("{}{}", file_name, suffix),
    }
}
