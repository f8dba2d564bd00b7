//! Bounded-attempt retry with backoff and optional fallback.
//!
//! Shared by the stage workers for their unreliable external calls.
//! Each stage picks its own backoff schedule and base delay. Exhaustion is
//! a distinct outcome from success - callers either get the last error
//! back ([`RetryPolicy::run`]) or have it masked by a fallback producer
//! invoked exactly once ([`RetryPolicy::run_with_fallback`]).

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Delay schedule between attempts. `attempt` is 1-based: the delay is
/// applied after attempt `n` fails and before attempt `n + 1` starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay after every failed attempt.
    Fixed(Duration),
    /// `attempt * base` (1x, 2x, 3x, ...).
    Linear(Duration),
    /// `2^(attempt - 1) * base` (1x, 2x, 4x, ...).
    Exponential(Duration),
}

impl Backoff {
    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Backoff::Fixed(base) => base,
            Backoff::Linear(base) => base * attempt,
            Backoff::Exponential(base) => base * 2u32.saturating_pow(attempt.saturating_sub(1)),
        }
    }
}

/// Retry policy: attempt ceiling plus backoff schedule.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    /// Create a policy. `max_attempts` is clamped to at least 1.
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `op` up to the attempt ceiling, sleeping per the backoff
    /// schedule between attempts. Returns the first success, or the
    /// last error once all attempts are exhausted.
    ///
    /// `what` labels the operation in log output.
    pub async fn run<T, E, F, Fut>(&self, what: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            tracing::debug!(what, attempt, max = self.max_attempts, "attempt");
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(what, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if attempt >= self.max_attempts => {
                    tracing::warn!(what, attempts = attempt, %err, "all attempts exhausted");
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.backoff.delay(attempt);
                    tracing::info!(
                        what,
                        attempt,
                        %err,
                        delay_ms = delay.as_millis() as u64,
                        "attempt failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Like [`run`](Self::run), but on exhaustion invokes `fallback`
    /// exactly once and returns its result instead of the final error.
    /// An error from the fallback itself propagates to the caller.
    pub async fn run_with_fallback<T, E, F, Fut, FB, FbFut>(
        &self,
        what: &str,
        op: F,
        fallback: FB,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        FB: FnOnce() -> FbFut,
        FbFut: Future<Output = Result<T, E>>,
        E: Display,
    {
        match self.run(what, op).await {
            Ok(value) => Ok(value),
            Err(_) => {
                tracing::info!(what, "using fallback after exhausted attempts");
                fallback().await
            }
        }
    }
}
