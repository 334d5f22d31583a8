//! notemirror-core - Core library for notemirror
//!
//! This crate contains the note model, the on-disk mirror, the remote store
//! contract with its HTTP client, and the engine that reconciles the two.

pub mod config;
pub mod error;
pub mod mirror;
pub mod models;
pub mod remote;
pub mod sync;
pub mod timestamp;
pub mod util;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use mirror::{Mirror, MirrorRecord};
pub use models::{Index, Note};
pub use remote::{ClientConfig, Credentials, HttpNoteStore, RemoteStore};
pub use sync::{NoteOutcome, SyncEngine, SyncFailure, SyncReport};
