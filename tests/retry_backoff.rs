// tests/retry_backoff.rs
// Retry schedule and limiter interaction, run under paused tokio time so
// multi-second backoffs resolve instantly and deterministically.

use brand_trend_scanner::{FetchError, RateLimiter, RetryPolicy, RetryingCaller};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn caller() -> RetryingCaller {
    RetryingCaller::new(RateLimiter::with_defaults())
}

#[tokio::test(start_paused = true)]
async fn quota_errors_follow_exponential_schedule() {
    let caller = caller();
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();

    let started = Instant::now();
    let result = caller
        .call("wall.get", RetryPolicy::listing(), || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(FetchError::Upstream { status: 429 })
                } else {
                    Ok(42)
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), 42);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);

    // Backoffs of 5s (attempt 0) and 10s (attempt 1), plus the 100ms
    // post-success cooldown.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(15_100), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(16), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn server_faults_back_off_linearly() {
    let caller = caller();
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();

    let started = Instant::now();
    let result = caller
        .call("groups.getById", RetryPolicy::metadata(), || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(FetchError::Upstream { status: 503 })
                } else {
                    Ok("ok")
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), "ok");
    // 2s then 4s of linear backoff.
    assert!(started.elapsed() >= Duration::from_secs(6));
    assert!(started.elapsed() < Duration::from_secs(7));
}

#[tokio::test(start_paused = true)]
async fn exhausted_budget_surfaces_last_error() {
    let caller = caller();
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();

    let result: Result<(), _> = caller
        .call("wall.get", RetryPolicy::metadata(), || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(FetchError::Upstream { status: 429 })
            }
        })
        .await;

    // Never a silent default: the caller sees the final error.
    assert!(matches!(result, Err(FetchError::Upstream { status: 429 })));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn unauthorized_is_fatal_on_first_attempt() {
    let caller = caller();
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();

    let result: Result<(), _> = caller
        .call("wall.get", RetryPolicy::listing(), || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(FetchError::Unauthorized("session expired".into()))
            }
        })
        .await;

    assert!(matches!(result, Err(FetchError::Unauthorized(_))));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn limiter_wait_consumes_no_attempt() {
    // Quota of 1: after the first success the window is full, so the second
    // call must wait out the window before its single attempt runs.
    let caller = RetryingCaller::new(RateLimiter::new(1, Duration::ZERO));

    let first = caller
        .call("op", RetryPolicy::metadata(), || async { Ok::<_, FetchError>(1) })
        .await;
    assert_eq!(first.unwrap(), 1);

    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();
    let started = Instant::now();
    let second = caller
        .call("op", RetryPolicy::metadata(), || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, FetchError>(2)
            }
        })
        .await;

    assert_eq!(second.unwrap(), 2);
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    // Waited out the quota window without burning retries.
    assert!(started.elapsed() >= Duration::from_secs(60));
}
