//! Error types for notemirror-core

use thiserror::Error;

/// Result type alias using notemirror-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in notemirror-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The mirror holds a local edit newer than the note being written
    #[error(
        "Conflict on note {key}: local content modified at {on_disk} is newer than incoming {incoming}"
    )]
    Conflict {
        /// Key of the note whose write was refused
        key: String,
        /// Fixed-point modification time of the content file on disk
        on_disk: String,
        /// Fixed-point `modifydate` of the refused note
        incoming: String,
    },

    /// Remote store answered with a non-success status
    #[error("Remote {operation} failed for {}: HTTP {status}: {message}", key.as_deref().unwrap_or("index"))]
    Remote {
        /// Remote operation name (e.g. `fetch_note`)
        operation: &'static str,
        /// Note key, when the operation targets a single note
        key: Option<String>,
        /// HTTP status code
        status: u16,
        /// Compacted response body or explanation
        message: String,
    },

    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed payload
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Note not found locally or remotely
    #[error("Note not found: {0}")]
    NotFound(String),

    /// Malformed fixed-point timestamp
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// True for the write guard refusing to overwrite a newer local edit.
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// True when a local mirror entry or remote note is absent.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// True for failures reported by, or while talking to, the remote store.
    pub const fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Remote { .. } | Self::Http(_) | Self::Serialization(_)
        )
    }
}
