//! Observability infrastructure
//!
//! Keyward crates emit `tracing` events with structured fields (`store`,
//! `key`, `attempt`, `delay_ms`, `error`). This module installs the
//! subscriber that formats them.

pub mod logging;

pub use logging::{init, init_with_filter, LogFormat};
