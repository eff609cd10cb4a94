//! Time utilities
//!
//! - **[`timer`]**: cancellable periodic tasks
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//!
//! use keyward_common::time::periodic;
//!
//! #[tokio::main]
//! async fn main() {
//!     let handle = periodic(Duration::from_millis(10), || async {
//!         // flush something
//!     });
//!
//!     tokio::time::sleep(Duration::from_millis(35)).await;
//!     handle.cancel();
//! }
//! ```

pub mod timer;

// Re-export commonly used items
pub use timer::{periodic, PeriodicHandle, TimerError, TimerHandle};
