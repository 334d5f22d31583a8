use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] notemirror_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No note content provided")]
    EmptyContent,
    #[error("Note key cannot be empty")]
    EmptyNoteKey,
    #[error("Editor command failed: {0}")]
    EditorFailed(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error(
        "Profile '{0}' is not signed in. Run `notemirror auth login --email <email>`, or set NOTEMIRROR_EMAIL and NOTEMIRROR_AUTH_TOKEN."
    )]
    NotSignedIn(String),
    #[error("{0} note(s) failed to sync")]
    SyncIncomplete(usize),
}
