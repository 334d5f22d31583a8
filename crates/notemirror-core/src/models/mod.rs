//! Data models for notemirror

mod note;

pub use note::{Index, Note};
