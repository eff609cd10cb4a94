//! # Keyward Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - Remote store adapters (in-memory, fault-injecting)
//! - Environment probes for the save gate
//! - Configuration loading from environment variables and files
//! - Tracing subscriber initialisation
//!
//! ## Architecture
//! - Implements traits defined in `keyward-core`
//! - Depends on `keyward-domain` and `keyward-core`
//! - Contains all "impure" code (I/O, process environment, global logging)

pub mod config;
pub mod environment;
pub mod observability;
pub mod remote;

// Re-export commonly used items
pub use environment::{EnvVarEnvironment, Environment, StaticEnvironment};
pub use observability::LogFormat;
pub use remote::{FaultyRemoteStore, InMemoryRemoteStore, RemoteStats};
