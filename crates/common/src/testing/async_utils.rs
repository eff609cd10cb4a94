//! Polling assertions for state that settles on a background task
//!
//! Subscription callbacks and autosave ticks run on spawned tasks, so a test
//! that triggers one has to wait for its effect rather than assert
//! immediately.

#![allow(clippy::missing_panics_doc)]

/// Interval between condition checks in [`assert_eventually_async!`]
pub const POLL_INTERVAL_MS: u64 = 10;

/// Poll an async condition until it holds, panicking once `$timeout` passes
///
/// Under a paused tokio clock the polling sleeps auto-advance, so the timeout
/// is virtual time and the assertion costs nothing in wall-clock terms.
///
/// ```no_run
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[tokio::test(start_paused = true)]
/// async fn callback_ran() {
///     let fired = Arc::new(AtomicBool::new(false));
///     let flag = Arc::clone(&fired);
///     tokio::spawn(async move { flag.store(true, Ordering::SeqCst) });
///
///     keyward_common::assert_eventually_async!(Duration::from_secs(1), async {
///         fired.load(Ordering::SeqCst)
///     });
/// }
/// ```
#[macro_export]
macro_rules! assert_eventually_async {
    ($timeout:expr, $fut:expr) => {{
        let limit = $timeout;
        let settled = tokio::time::timeout(limit, async {
            while !$fut.await {
                tokio::time::sleep(std::time::Duration::from_millis(
                    $crate::testing::async_utils::POLL_INTERVAL_MS,
                ))
                .await;
            }
        })
        .await;

        assert!(settled.is_ok(), "condition still false after {:?}", limit);
    }};
}
