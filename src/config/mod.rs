//! Configuration management for Matterdesk

pub mod loader;
mod schema;

pub use loader::{apply_env_overrides, load_config, load_config_from_path};
pub use schema::*;
