//! Configuration loading
//!
//! Builds a [`keyward_domain::StoreConfig`] from environment variables or
//! from TOML / JSON files.

pub mod loader;

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, parse_config, probe_config_paths};
