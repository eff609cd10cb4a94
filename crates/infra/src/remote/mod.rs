//! Remote store adapters
//!
//! Implementations of `keyward_core::RemoteStore` that stand in for the real
//! key-value service: an in-memory namespace store and a wrapper that
//! injects scripted failures and latency.

pub mod faulty;
pub mod memory;

pub use faulty::FaultyRemoteStore;
pub use memory::{InMemoryRemoteStore, RemoteStats};
