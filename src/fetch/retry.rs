//! Bounded retry with a fixed delay around whole fetch attempts.
//!
//! A failed attempt is classified into an [`ErrorKind`]. The [`RetryPolicy`]
//! decides whether another attempt is made: only kinds in the policy's
//! retryable set are retried (connectivity and transfer failures by default),
//! and never more than `max_attempts` times in total.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use ftp_fetch::fetch::{ErrorKind, FetchError, RetryDecision, RetryPolicy, classify_error};
//!
//! let policy = RetryPolicy::new(2, Duration::from_secs(10));
//! let error = FetchError::authentication("anonymous", 530, "Login incorrect.");
//!
//! match policy.should_retry(classify_error(&error), 1) {
//!     RetryDecision::Retry { delay, attempt } => println!("retry #{attempt} in {delay:?}"),
//!     RetryDecision::DoNotRetry { reason } => println!("giving up: {reason}"),
//! }
//! ```

use std::future::Future;
use std::time::Duration;

use tracing::{debug, instrument};

use super::constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
use super::events::{EventSink, FetchEvent};
use super::{ErrorKind, FetchError};

/// Error kinds retried when no explicit set is configured.
pub const DEFAULT_RETRYABLE_KINDS: [ErrorKind; 2] = [ErrorKind::Connectivity, ErrorKind::Transfer];

/// Decision on whether to run another attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Run another attempt after the delay.
    Retry {
        /// How long to wait before the next attempt.
        delay: Duration,
        /// Number of the next attempt (1-indexed, so the first retry is attempt 2).
        attempt: u32,
    },

    /// Stop and report the last failure.
    DoNotRetry {
        /// Human-readable reason.
        reason: String,
    },
}

/// Retry configuration: attempt bound, fixed delay, retryable kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Delay between attempts. Not scaled between attempts.
    delay: Duration,

    /// Failure kinds that allow another attempt.
    retryable: Vec<ErrorKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }
}

impl RetryPolicy {
    /// Creates a policy retrying the default kinds.
    ///
    /// `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            retryable: DEFAULT_RETRYABLE_KINDS.to_vec(),
        }
    }

    /// Replaces the set of retryable kinds.
    #[must_use]
    pub fn with_retryable_kinds(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        self.retryable = kinds.into_iter().collect();
        self
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the fixed delay between attempts.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns true if `kind` allows another attempt.
    #[must_use]
    pub fn is_retryable(&self, kind: ErrorKind) -> bool {
        self.retryable.contains(&kind)
    }

    /// Determines whether to run another attempt after `attempt` (1-indexed) failed.
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, kind: ErrorKind, attempt: u32) -> RetryDecision {
        if !self.is_retryable(kind) {
            return RetryDecision::DoNotRetry {
                reason: format!("{kind:?} failure - retry would not help"),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = self.delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay: self.delay,
            attempt: attempt + 1,
        }
    }
}

/// Final failure of a retried operation.
#[derive(Debug)]
pub struct FetchFailure {
    /// Error of the last attempt that ran.
    pub error: FetchError,
    /// How many attempts ran.
    pub attempts: u32,
}

impl FetchFailure {
    /// Category of the final error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        classify_error(&self.error)
    }
}

/// Runs `attempt_fn` until it succeeds, fails with a non-retryable kind, or
/// the policy's attempt bound is reached.
///
/// `attempt_fn` receives the 1-indexed attempt number. The delay between
/// attempts is awaited inline, so attempts never overlap.
///
/// # Errors
///
/// Returns [`FetchFailure`] holding the last error and the number of attempts run.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    sink: &dyn EventSink,
    mut attempt_fn: F,
) -> Result<T, FetchFailure>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 1;
    loop {
        let error = match attempt_fn(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        let kind = classify_error(&error);
        sink.emit(&FetchEvent::AttemptFailed {
            attempt,
            max_attempts: policy.max_attempts(),
            kind,
            error: error.to_string(),
        });

        match policy.should_retry(kind, attempt) {
            RetryDecision::Retry {
                delay,
                attempt: next,
            } => {
                sink.emit(&FetchEvent::RetryScheduled {
                    next_attempt: next,
                    delay,
                });
                tokio::time::sleep(delay).await;
                attempt = next;
            }
            RetryDecision::DoNotRetry { reason } => {
                debug!(attempt, %reason, "not retrying");
                return Err(FetchFailure {
                    error,
                    attempts: attempt,
                });
            }
        }
    }
}

/// Same as [`run_with_retry`] but collapses every failure into `None`.
///
/// Failure detail is only available through `sink`.
pub async fn retry_silently<T, F, Fut>(
    policy: &RetryPolicy,
    sink: &dyn EventSink,
    attempt_fn: F,
) -> Option<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    run_with_retry(policy, sink, attempt_fn).await.ok()
}

/// Classifies a fetch error for retry decisions.
///
/// | Error | Kind |
/// |-------|------|
/// | `InvalidAddress` | Address |
/// | `Connect`, `Timeout`, `ControlChannel`, `ServiceUnavailable` | Connectivity |
/// | `Authentication` | Authentication |
/// | `Negotiation` | ProtocolNegotiation |
/// | `NotFound` | NotFound |
/// | `Transfer` | Transfer |
/// | `Decoding` | Decoding |
#[must_use]
pub fn classify_error(error: &FetchError) -> ErrorKind {
    match error {
        FetchError::InvalidAddress { .. } => ErrorKind::Address,
        FetchError::Connect { .. }
        | FetchError::Timeout { .. }
        | FetchError::ControlChannel { .. }
        | FetchError::ServiceUnavailable { .. } => ErrorKind::Connectivity,
        FetchError::Authentication { .. } => ErrorKind::Authentication,
        FetchError::Negotiation { .. } => ErrorKind::ProtocolNegotiation,
        FetchError::NotFound { .. } => ErrorKind::NotFound,
        FetchError::Transfer { .. } => ErrorKind::Transfer,
        FetchError::Decoding { .. } => ErrorKind::Decoding,
    }
}
