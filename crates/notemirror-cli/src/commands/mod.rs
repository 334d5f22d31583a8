pub mod add;
pub mod auth_cmd;
pub mod clone;
pub mod common;
pub mod completions;
pub mod config;
pub mod delete;
pub mod list;
pub mod show;
pub mod sync;
