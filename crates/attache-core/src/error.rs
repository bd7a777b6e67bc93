//! Error types module
//!
//! `FileError` is the taxonomy every public file operation surfaces. Input
//! errors (bad references, unsafe paths, folder misuse, limits) abort the
//! operation and are never retried internally. `BackendUnavailable` wraps any
//! I/O or network failure from a storage adapter and is the only variant a
//! caller may reasonably retry.

use crate::storage_types::StorageBackend;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected, user-correctable failures
    Debug,
    /// Recoverable issues
    Warn,
    /// Unexpected failures
    Error,
}

/// Self-description of an error for whoever reports it to a user.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "INVALID_REFERENCE")
    fn error_code(&self) -> &'static str;

    /// Whether the caller may retry the same operation
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("Invalid file reference: {0}")]
    InvalidReference(String),

    #[error("Unsafe file path: {0}")]
    UnsafePath(String),

    #[error("Cannot access file content of a folder: {0}")]
    FolderContentError(String),

    #[error("File content is not managed by this system ({backend}): {reference}")]
    NotManagedError {
        backend: StorageBackend,
        reference: String,
    },

    #[error("Maximum number of attachments ({limit}) reached for {doctype} {name}")]
    AttachmentLimitExceeded {
        doctype: String,
        name: String,
        limit: usize,
    },

    #[error("Invalid remote URL: {0}")]
    InvalidRemoteUrl(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid lifecycle transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("Storage backend unavailable: {message}")]
    BackendUnavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type for file operations
pub type FileResult<T> = Result<T, FileError>;

impl FileError {
    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        FileError::BackendUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Whether this error came from the caller's input rather than a backend.
    pub fn is_input_error(&self) -> bool {
        !matches!(
            self,
            FileError::BackendUnavailable { .. } | FileError::NotFound(_)
        )
    }
}

impl ErrorMetadata for FileError {
    fn error_code(&self) -> &'static str {
        match self {
            FileError::InvalidReference(_) => "INVALID_REFERENCE",
            FileError::UnsafePath(_) => "UNSAFE_PATH",
            FileError::FolderContentError(_) => "FOLDER_CONTENT",
            FileError::NotManagedError { .. } => "NOT_MANAGED",
            FileError::AttachmentLimitExceeded { .. } => "ATTACHMENT_LIMIT_EXCEEDED",
            FileError::InvalidRemoteUrl(_) => "INVALID_REMOTE_URL",
            FileError::NotFound(_) => "NOT_FOUND",
            FileError::InvalidInput(_) => "INVALID_INPUT",
            FileError::InvalidTransition { .. } => "INVALID_TRANSITION",
            FileError::BackendUnavailable { .. } => "BACKEND_UNAVAILABLE",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, FileError::BackendUnavailable { .. })
    }

    fn client_message(&self) -> String {
        match self {
            FileError::UnsafePath(_) => "Cannot access file path".to_string(),
            FileError::BackendUnavailable { .. } => "Failed to access storage".to_string(),
            other => other.to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            FileError::BackendUnavailable { .. } => LogLevel::Error,
            FileError::UnsafePath(_) | FileError::InvalidTransition { .. } => LogLevel::Warn,
            _ => LogLevel::Debug,
        }
    }
}

impl From<std::io::Error> for FileError {
    fn from(err: std::io::Error) -> Self {
        FileError::BackendUnavailable {
            message: format!("IO error: {}", err),
            source: Some(Box::new(err)),
        }
    }
}
