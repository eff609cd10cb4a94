//! Test helpers shared by the Keyward crates
//!
//! Enable the `test-utils` feature to use these from another crate's tests.
//! The [`assert_eventually_async!`](crate::assert_eventually_async) macro is
//! exported at the crate root.

pub mod async_utils;
