//! Timeout-only retry state machine
//!
//! Attempts are numbered from 0. After a timed-out attempt `n` with
//! `n < max_retries` the machine waits `2^n` seconds (1s, 2s, 4s, ...) and
//! moves to attempt `n + 1`. Every other failure is final: error responses
//! (HTTP >= 400, SOAP faults, gRPC status) are assumed not to be transient.

use std::time::Duration;

/// Upper bound on the backoff exponent (2^16 s is already ~18 hours).
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// How a single attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    TimedOut,
    Failed,
}

/// Position in the retry sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Attempt(u32),
    Success,
    Failure,
}

/// What the caller should do after an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Sleep for `backoff`, then run `next_attempt` with a fresh deadline.
    Retry { next_attempt: u32, backoff: Duration },
    /// Stop; the state is `Success` or `Failure`.
    Finish(RetryState),
}

/// Retry budget for one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn max_retries(self) -> u32 {
        self.max_retries
    }

    /// Total attempts the policy allows.
    pub fn max_attempts(self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Transition out of `Attempt(attempt)` given how it ended.
    pub fn next(self, attempt: u32, outcome: AttemptOutcome) -> Transition {
        match outcome {
            AttemptOutcome::Succeeded => Transition::Finish(RetryState::Success),
            AttemptOutcome::TimedOut if attempt < self.max_retries => {
                let next_attempt = attempt + 1;
                Transition::Retry { next_attempt, backoff: backoff_before(next_attempt) }
            }
            AttemptOutcome::TimedOut | AttemptOutcome::Failed => {
                Transition::Finish(RetryState::Failure)
            }
        }
    }
}

/// Delay before attempt `attempt` (>= 1): `2^(attempt-1)` seconds.
pub fn backoff_before(attempt: u32) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    let exponent = (attempt - 1).min(MAX_BACKOFF_EXPONENT);
    Duration::from_secs(1u64 << exponent)
}
