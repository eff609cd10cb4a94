//! Resilience patterns for unreliable remote calls
//!
//! This module provides a **generic, reusable** retry executor with
//! exponential backoff and jitter. It knows nothing about stores or keys: any
//! fallible async operation can be wrapped.
//!
//! The default configuration waits `2^i + random(0, 1)` time units after the
//! `i`-th failed attempt and gives up after five attempts.

pub mod retry;

// Re-export retry types
pub use retry::{
    policies, BackoffStrategy, FixedJitter, Jitter, JitterSource, RetryConfig, RetryConfigBuilder,
    RetryDecision, RetryError, RetryExecutor, RetryOutcome, RetryPolicy, RetryResult,
    ThreadRngJitter, DEFAULT_MAX_ATTEMPTS,
};
