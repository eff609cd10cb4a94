//! Domain-free utilities shared across Keyward crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `runtime` (default): async infrastructure (resilience, time)
//! - `test-utils`: asynchronous assertion helpers for tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Async retry and timers
#[cfg(feature = "runtime")]
pub mod resilience;
#[cfg(feature = "runtime")]
pub mod time;

// Test helpers
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

#[cfg(feature = "runtime")]
pub use resilience::{
    BackoffStrategy, FixedJitter, Jitter, JitterSource, RetryConfig, RetryConfigBuilder,
    RetryDecision, RetryError, RetryExecutor, RetryOutcome, RetryPolicy, RetryResult,
    ThreadRngJitter,
};
#[cfg(feature = "runtime")]
pub use time::{PeriodicHandle, TimerHandle};
