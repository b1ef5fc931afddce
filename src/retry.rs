//! # Retrying Caller
//! Wraps a remote operation with the rate limiter and a classification-aware
//! retry schedule: exponential backoff for quota signals, linear backoff for
//! transient server faults, a flat pause otherwise. Exhausted retries always
//! surface the last error; callers decide whether to degrade.

use crate::limiter::{Gate, RateLimiter};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Errors a remote call can report to the retry layer.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("upstream fault (status {status})")]
    Upstream { status: u16 },
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("{0}")]
    Other(String),
}

impl FetchError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Classification used to pick a backoff schedule.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RateLimited(_) => ErrorKind::Quota,
            Self::Upstream { status: 429 } => ErrorKind::Quota,
            Self::Upstream { status } if matches!(status, 502 | 503) => ErrorKind::Transient,
            Self::Unauthorized(_) => ErrorKind::Fatal,
            Self::Other(msg) if looks_rate_limited(msg) => ErrorKind::Quota,
            _ => ErrorKind::Retryable,
        }
    }
}

/// Some upstreams only signal throttling in the message body.
fn looks_rate_limited(msg: &str) -> bool {
    let m = msg.to_ascii_lowercase();
    m.contains("rate limit") || m.contains("too many requests") || m.contains("429")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Quota/rate-limit signal: exponential backoff.
    Quota,
    /// 502/503-class fault: linear backoff.
    Transient,
    /// Not retryable (invalid session, revoked token).
    Fatal,
    /// Anything else: flat pause, retry while budget remains.
    Retryable,
}

/// Budget and schedule for one call type. Metadata lookups get a tighter
/// budget than heavier listing calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Exponential base for quota errors.
    pub backoff_base: Duration,
    /// Ceiling for the exponential schedule.
    pub backoff_cap: Duration,
    /// Linear step for transient server faults.
    pub server_step: Duration,
    /// Flat wait for unclassified errors.
    pub misc_wait: Duration,
    /// Safety margin inserted after every successful call.
    pub cooldown: Duration,
}

impl RetryPolicy {
    fn base() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(5),
            backoff_cap: Duration::from_secs(300),
            server_step: Duration::from_secs(2),
            misc_wait: Duration::from_secs(1),
            cooldown: Duration::from_millis(100),
        }
    }

    /// Lightweight metadata calls: 3 attempts.
    pub fn metadata() -> Self {
        Self::base()
    }

    /// Heavier listing calls: 5 attempts.
    pub fn listing() -> Self {
        Self {
            max_attempts: 5,
            ..Self::base()
        }
    }

    pub fn with_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    fn quota_backoff(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.backoff_cap)
    }
}

/// Applies a [`RetryPolicy`] around a remote call site, gated by the shared
/// [`RateLimiter`].
#[derive(Debug, Clone)]
pub struct RetryingCaller {
    limiter: RateLimiter,
}

impl RetryingCaller {
    pub fn new(limiter: RateLimiter) -> Self {
        Self { limiter }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Run `operation` under `op`'s quota with the given policy.
    ///
    /// Waiting on the limiter never consumes an attempt; only a completed
    /// call (success or failure) does. Successful calls are recorded against
    /// the quota and followed by the policy cooldown.
    pub async fn call<F, Fut, T>(
        &self,
        op: &str,
        policy: RetryPolicy,
        mut operation: F,
    ) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            loop {
                match self.limiter.allow(op) {
                    Gate { permitted: true, .. } => break,
                    Gate { wait, .. } => {
                        debug!(op, wait_ms = wait.as_millis() as u64, "limiter closed, waiting");
                        sleep(wait).await;
                    }
                }
            }

            match operation().await {
                Ok(v) => {
                    self.limiter.record(op);
                    sleep(policy.cooldown).await;
                    return Ok(v);
                }
                Err(e) => match e.kind() {
                    ErrorKind::Fatal => {
                        warn!(op, error = %e, "fatal error, not retrying");
                        return Err(e);
                    }
                    _ if attempt + 1 >= policy.max_attempts => {
                        warn!(op, attempts = attempt + 1, error = %e, "retry budget exhausted");
                        return Err(e);
                    }
                    ErrorKind::Quota => {
                        let wait = policy.quota_backoff(attempt);
                        warn!(
                            op,
                            attempt,
                            wait_secs = wait.as_secs(),
                            "quota hit, backing off"
                        );
                        sleep(wait).await;
                        attempt += 1;
                    }
                    ErrorKind::Transient => {
                        let wait = policy.server_step * (attempt + 1);
                        warn!(
                            op,
                            attempt,
                            wait_secs = wait.as_secs(),
                            "upstream fault, retrying"
                        );
                        sleep(wait).await;
                        attempt += 1;
                    }
                    ErrorKind::Retryable => {
                        debug!(op, attempt, error = %e, "retrying after flat pause");
                        sleep(policy.misc_wait).await;
                        attempt += 1;
                    }
                },
            }
        }
    }
}
