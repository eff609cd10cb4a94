//! Bounded retries with exponential backoff for throttled remote calls
//!
//! An operation is re-invoked unchanged after each failure, so callers must
//! only wrap operations that are safe to repeat. Nothing is deduplicated
//! between attempts.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Attempts made by the default configuration before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Why a retried operation did not produce a value
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt in the budget failed
    #[error("gave up after {attempts} tries, last error: {last_error:?}")]
    Exhausted { attempts: u32, last_error: E },

    /// The policy classified the failure as permanent
    #[error("stopped after {attempts} tries on non-retryable error: {error:?}")]
    NonRetryable { attempts: u32, error: E },

    /// The configuration was rejected before any attempt ran
    #[error("Invalid retry configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl<E> RetryError<E> {
    fn invalid(message: &str) -> Self {
        Self::InvalidConfiguration { message: message.to_string() }
    }

    /// Error produced by the final attempt
    pub fn last_error(&self) -> Option<&E> {
        match self {
            Self::Exhausted { last_error: error, .. } | Self::NonRetryable { error, .. } => {
                Some(error)
            }
            Self::InvalidConfiguration { .. } => None,
        }
    }

    /// Consume the error, keeping only the final attempt's error
    pub fn into_last_error(self) -> Option<E> {
        match self {
            Self::Exhausted { last_error: error, .. } | Self::NonRetryable { error, .. } => {
                Some(error)
            }
            Self::InvalidConfiguration { .. } => None,
        }
    }

    /// Attempts that actually ran; zero for a rejected configuration
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } | Self::NonRetryable { attempts, .. } => *attempts,
            Self::InvalidConfiguration { .. } => 0,
        }
    }
}

pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// Result of a retried call plus how much work it took
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: RetryResult<T, E>,
    pub attempts: u32,
    /// Sum of every backoff slept between attempts
    pub total_delay: Duration,
}

impl<T, E> RetryOutcome<T, E> {
    /// Drop the statistics and keep the result
    pub fn into_result(self) -> RetryResult<T, E> {
        self.result
    }

    /// Whether some attempt succeeded
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Classifies a failure as worth another attempt or not
pub trait RetryPolicy<E> {
    /// `attempt` is the 1-based number of the attempt that produced `error`
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Sleep for the configured backoff, then try again
    Retry,
    /// Sleep for exactly this long, then try again
    RetryAfter(Duration),
    Stop,
}

/// Base wait after a failed attempt, before jitter
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Same wait after every failure
    Fixed(Duration),
    /// `unit * 2^attempt`, so the first failure waits two units and the
    /// fourth waits sixteen
    UnitExponential { unit: Duration },
}

impl BackoffStrategy {
    /// Base wait after the given 1-based failed attempt
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::UnitExponential { unit } => {
                unit.saturating_mul(2u32.checked_pow(attempt).unwrap_or(u32::MAX))
            }
        }
    }
}

/// Uniform samples in `[0, 1)` feeding the jitter
pub trait JitterSource: Send + Sync {
    fn sample(&self) -> f64;
}

/// Samples from `rand::thread_rng`
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngJitter;

impl JitterSource for ThreadRngJitter {
    fn sample(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Always returns the wrapped sample (clamped to `[0, 1]`)
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub f64);

impl JitterSource for FixedJitter {
    fn sample(&self) -> f64 {
        self.0.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Jitter {
    None,
    /// Adds `sample * max` on top of the base wait
    Additive { max: Duration },
}

impl Jitter {
    /// Add jitter from `source` to `delay`
    pub fn apply(&self, delay: Duration, source: &dyn JitterSource) -> Duration {
        match self {
            Self::None => delay,
            Self::Additive { max } => delay + max.mul_f64(source.sample()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Budget including the first attempt
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
    pub jitter: Jitter,
}

impl Default for RetryConfig {
    /// Five attempts in one-second units
    fn default() -> Self {
        Self::with_time_unit(Duration::from_secs(1))
    }
}

impl RetryConfig {
    /// Start from the default five-try configuration
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::default()
    }

    /// Five attempts, waiting `2^i` units plus up to one unit of jitter
    /// after the `i`-th failure
    pub fn with_time_unit(unit: Duration) -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: BackoffStrategy::UnitExponential { unit },
            jitter: Jitter::Additive { max: unit },
        }
    }

    /// Reject an empty attempt budget or a zero backoff unit
    pub fn validate(&self) -> Result<(), RetryError<()>> {
        if self.max_attempts == 0 {
            return Err(RetryError::invalid("max_attempts must be greater than 0"));
        }
        if let BackoffStrategy::UnitExponential { unit } = &self.backoff {
            if unit.is_zero() {
                return Err(RetryError::invalid("backoff unit must be greater than 0"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    /// Attempt budget, including the first attempt
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// Wait the same `delay` after every failure
    pub fn fixed_backoff(mut self, delay: Duration) -> Self {
        self.config.backoff = BackoffStrategy::Fixed(delay);
        self
    }

    /// Wait `unit * 2^attempt` after each failure
    pub fn unit_exponential_backoff(mut self, unit: Duration) -> Self {
        self.config.backoff = BackoffStrategy::UnitExponential { unit };
        self
    }

    /// Use the base wait as is
    pub fn no_jitter(mut self) -> Self {
        self.config.jitter = Jitter::None;
        self
    }

    /// Add up to `max` of random wait
    pub fn additive_jitter(mut self, max: Duration) -> Self {
        self.config.jitter = Jitter::Additive { max };
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> Result<RetryConfig, RetryError<()>> {
        self.config.validate().map(|()| self.config)
    }
}

/// Runs an operation until it succeeds, the policy stops it, or the attempt
/// budget runs out
pub struct RetryExecutor<P = policies::AlwaysRetry> {
    config: RetryConfig,
    policy: P,
    jitter_source: Arc<dyn JitterSource>,
}

impl<P: fmt::Debug> fmt::Debug for RetryExecutor<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("config", &self.config)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RetryExecutor<policies::AlwaysRetry> {
    /// Executor that retries every failure
    pub fn always(config: RetryConfig) -> Self {
        Self::new(config, policies::AlwaysRetry)
    }
}

impl<P> RetryExecutor<P> {
    /// Executor with a custom retry policy
    pub fn new(config: RetryConfig, policy: P) -> Self {
        Self { config, policy, jitter_source: Arc::new(ThreadRngJitter) }
    }

    /// Replace the randomness behind jitter
    pub fn with_jitter_source(mut self, source: Arc<dyn JitterSource>) -> Self {
        self.jitter_source = source;
        self
    }

    /// Configuration this executor runs with
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Wait after the given 1-based failed attempt, jitter included
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.config.backoff.calculate_delay(attempt);
        self.config.jitter.apply(base, self.jitter_source.as_ref())
    }

    /// Run `operation` until it succeeds or retrying stops
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> RetryResult<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with_outcome(operation).await.into_result()
    }

    /// Like [`RetryExecutor::execute`], plus attempt count and total delay
    #[instrument(skip(self, operation), fields(max_attempts = self.config.max_attempts))]
    pub async fn execute_with_outcome<F, Fut, T, E>(&self, mut operation: F) -> RetryOutcome<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let budget = self.config.max_attempts.max(1);
        let mut total_delay = Duration::ZERO;
        let mut attempt = 1;

        let result = loop {
            let error = match operation().await {
                Ok(value) => {
                    debug!(attempt, "operation succeeded");
                    break Ok(value);
                }
                Err(error) => error,
            };

            if attempt == budget {
                warn!(attempts = attempt, error = ?error, "retry budget exhausted");
                break Err(RetryError::Exhausted { attempts: attempt, last_error: error });
            }

            let delay = match self.policy.should_retry(&error, attempt) {
                RetryDecision::Retry => self.delay_for(attempt),
                RetryDecision::RetryAfter(delay) => delay,
                RetryDecision::Stop => {
                    debug!(attempt, error = ?error, "policy refused to retry");
                    break Err(RetryError::NonRetryable { attempts: attempt, error });
                }
            };

            warn!(
                attempt,
                delay_ms = saturating_millis(delay),
                error = ?error,
                "attempt failed, backing off"
            );
            tokio::time::sleep(delay).await;
            total_delay += delay;
            attempt += 1;
        };

        RetryOutcome { result, attempts: attempt, total_delay }
    }
}

/// Whole milliseconds in `delay`, capped at `u64::MAX`
fn saturating_millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

pub mod policies {
    use super::{RetryDecision, RetryPolicy};

    /// Treats every failure as transient
    #[derive(Debug, Clone, Copy, Default)]
    pub struct AlwaysRetry;

    impl<E> RetryPolicy<E> for AlwaysRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Retry
        }
    }

    /// Retries while `classify(error, attempt)` returns true
    #[derive(Debug)]
    pub struct PredicateRetry<F> {
        classify: F,
    }

    impl<F> PredicateRetry<F> {
        pub fn new(classify: F) -> Self {
            Self { classify }
        }
    }

    impl<F, E> RetryPolicy<E> for PredicateRetry<F>
    where
        F: Fn(&E, u32) -> bool,
    {
        fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision {
            if (self.classify)(error, attempt) {
                RetryDecision::Retry
            } else {
                RetryDecision::Stop
            }
        }
    }
}
