//! # Keyward Domain
//!
//! Domain types shared by every Keyward crate.
//!
//! This crate contains:
//! - Cache keys and opaque values
//! - The closed set of store setting names and their defaults
//! - Store configuration structures
//! - Error types and the `Result` alias
//!
//! ## Architecture
//! - No dependencies on other Keyward crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
