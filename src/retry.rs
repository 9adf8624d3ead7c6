//! Fixed-delay retries and the attempt loop shared by both clients.
//!
//! The loop itself is a small state machine, [`RetryState`]: feed it the
//! result of each attempt and it answers with a [`Step`]. It never sleeps or
//! performs I/O, so the blocking client drives it with `std::thread::sleep`
//! and the async client with `tokio::time::sleep`, and both make exactly the
//! same decisions.

use crate::interpret::{classify, Outcome};
use crate::transport::{RawResponse, TransportError};
use crate::Error;
use std::time::Duration;

/// Additional attempts made after the first one fails, by default.
pub const DEFAULT_RETRIES: usize = 3;

/// Pause between attempts, by default.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// How many times to retry, and how long to wait in between.
///
/// The delay is fixed: no exponential growth, no jitter. A call against a
/// server that keeps failing takes roughly
/// `(retries + 1) * timeout + retries * delay` in the worst case.
///
/// # Examples
///
/// ```
/// use tether::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(2, Duration::from_millis(250));
/// assert_eq!(policy.max_attempts(), 3);
/// assert_eq!(policy.delay_for_attempt(1), Some(Duration::from_millis(250)));
/// assert_eq!(policy.delay_for_attempt(2), Some(Duration::from_millis(250)));
/// assert_eq!(policy.delay_for_attempt(3), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first.
    pub retries: usize,
    /// Pause before each retry.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(retries: usize, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// A policy that makes a single attempt.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> usize {
        self.retries.saturating_add(1)
    }

    /// Returns the delay to wait after the given failed attempt (1-indexed),
    /// or `None` if no attempts remain.
    pub fn delay_for_attempt(&self, attempt: usize) -> Option<Duration> {
        if attempt > self.retries {
            None
        } else {
            Some(self.delay)
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRIES, DEFAULT_RETRY_DELAY)
    }
}

/// What the caller should do after an attempt.
#[derive(Debug)]
pub(crate) enum Step {
    /// A 2xx response; stop and interpret it.
    Deliver(RawResponse),
    /// Wait this long, then attempt again.
    Retry(Duration),
    /// Give up with this error.
    Fail(Error),
}

/// Retry bookkeeping for one logical call.
#[derive(Debug)]
pub(crate) struct RetryState {
    policy: RetryPolicy,
    attempts: usize,
}

impl RetryState {
    pub(crate) fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    /// Records the start of an attempt and returns its 1-based number.
    pub(crate) fn begin_attempt(&mut self) -> usize {
        self.attempts += 1;
        self.attempts
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts
    }

    /// Decides what follows the attempt that produced `result`.
    pub(crate) fn on_result(&mut self, result: Result<RawResponse, TransportError>) -> Step {
        let attempt = self.attempts;

        let response = match result {
            Ok(response) => response,
            Err(source) => {
                tracing::warn!(error = %source, attempt = attempt, "Request attempt failed");
                return self.retry_or(|attempts| Error::Transport { attempts, source });
            }
        };

        match classify(response.status) {
            Outcome::Success => Step::Deliver(response),
            Outcome::ClientError => {
                let raw_response = response.text();
                tracing::error!(
                    status = response.status.as_u16(),
                    response = %raw_response,
                    "Client error (4xx)"
                );
                Step::Fail(Error::Client {
                    status: response.status,
                    attempts: attempt,
                    raw_response,
                    headers: response.headers,
                })
            }
            Outcome::ServerError => {
                let raw_response = response.text();
                tracing::warn!(
                    status = response.status.as_u16(),
                    response = %raw_response,
                    attempt = attempt,
                    "Server error (5xx)"
                );
                self.retry_or(|attempts| Error::Server {
                    status: response.status,
                    attempts,
                    raw_response,
                    headers: response.headers,
                })
            }
            Outcome::TransportError => {
                tracing::warn!(
                    status = response.status.as_u16(),
                    attempt = attempt,
                    "Unexpected response status"
                );
                self.retry_or(|attempts| Error::Transport {
                    attempts,
                    source: TransportError::UnexpectedStatus(response.status),
                })
            }
        }
    }

    fn retry_or(&self, exhausted: impl FnOnce(usize) -> Error) -> Step {
        match self.policy.delay_for_attempt(self.attempts) {
            Some(delay) => {
                tracing::info!(
                    delay_ms = delay.as_millis(),
                    attempt = self.attempts,
                    "Retrying request after delay"
                );
                Step::Retry(delay)
            }
            None => {
                let error = exhausted(self.attempts);
                tracing::error!(error = %error, attempts = self.attempts, "Retries exhausted");
                Step::Fail(error)
            }
        }
    }
}
