//! Cancellable periodic timers
//!
//! A periodic task waits one period, runs its tick to completion, and waits
//! again until cancelled. Cancellation is only observed while waiting: a tick
//! that has already started always finishes.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Errors raised while shutting a timer down
#[derive(Debug, Error)]
pub enum TimerError {
    /// The task did not finish within the join timeout
    #[error("Timer task did not stop within {duration:?}")]
    JoinTimeout { duration: Duration },

    /// The task panicked or was aborted
    #[error("Timer task join failed: {0}")]
    Join(String),
}

/// Cancellation flag shared between a timer task and its owner
#[derive(Debug, Clone, Default)]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    /// Create a handle that is not cancelled yet
    pub fn new() -> Self {
        Self { token: CancellationToken::new() }
    }

    /// Stop the timer at its next wait point
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether [`TimerHandle::cancel`] has been called
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the timer is cancelled
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

/// Handle to a running periodic task
///
/// Dropping the handle cancels the task.
#[derive(Debug)]
pub struct PeriodicHandle {
    timer: TimerHandle,
    period: Duration,
    task: Option<JoinHandle<()>>,
}

impl PeriodicHandle {
    /// Period the task was started with
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Request cancellation; an in-flight tick still runs to completion
    pub fn cancel(&self) {
        self.timer.cancel();
    }

    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.timer.is_cancelled()
    }

    /// Check if the task's loop has exited
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Cancel the task and wait for its loop to exit
    ///
    /// # Errors
    ///
    /// Returns `TimerError::JoinTimeout` if the in-flight tick outlives
    /// `join_timeout`, or `TimerError::Join` if the task panicked.
    pub async fn shutdown(mut self, join_timeout: Duration) -> Result<(), TimerError> {
        self.timer.cancel();
        let Some(task) = self.task.take() else {
            return Ok(());
        };

        tokio::time::timeout(join_timeout, task)
            .await
            .map_err(|_| TimerError::JoinTimeout { duration: join_timeout })?
            .map_err(|err| TimerError::Join(err.to_string()))
    }
}

impl Drop for PeriodicHandle {
    fn drop(&mut self) {
        self.timer.cancel();
    }
}

/// Spawn a task that runs `tick` every `period` until cancelled
///
/// The first tick happens one full period after the call.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// use keyward_common::time::timer::periodic;
///
/// #[tokio::main]
/// async fn main() {
///     let handle = periodic(Duration::from_secs(1), || async {
///         println!("Tick!");
///     });
///
///     tokio::time::sleep(Duration::from_secs(5)).await;
///     handle.cancel();
/// }
/// ```
pub fn periodic<F, Fut>(period: Duration, mut tick: F) -> PeriodicHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let timer = TimerHandle::new();
    let cancel = timer.clone();

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("Periodic task cancelled");
                    break;
                }
                () = tokio::time::sleep(period) => {
                    tick().await;
                }
            }
        }
    });

    PeriodicHandle { timer, period, task: Some(task) }
}
