//! # Rate Limiter
//! Per-operation call gate: a rolling one-minute quota plus a minimum
//! inter-call spacing floor. `allow` only answers the question; callers
//! record a call that actually went out via `record`, so speculative checks
//! are never double counted.
//!
//! State is an injectable instance (cheaply cloneable handle over shared
//! state), keyed by operation name, safe under concurrent scans.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_PER_MINUTE_QUOTA: u32 = 100;
pub const DEFAULT_MIN_SPACING: Duration = Duration::from_millis(350);

/// Quota window length; counters reset once a full window has elapsed.
const WINDOW: Duration = Duration::from_secs(60);

/// Answer from [`RateLimiter::allow`]: either go now, or wait this long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    pub permitted: bool,
    pub wait: Duration,
}

impl Gate {
    fn open() -> Self {
        Self {
            permitted: true,
            wait: Duration::ZERO,
        }
    }

    fn closed(wait: Duration) -> Self {
        Self {
            permitted: false,
            wait,
        }
    }
}

#[derive(Debug)]
struct KeyState {
    window_start: Instant,
    count: u32,
    last_call: Option<Instant>,
}

/// Thread-safe limiter keyed by operation name.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<HashMap<String, KeyState>>>,
    quota_per_minute: u32,
    min_spacing: Duration,
}

impl RateLimiter {
    pub fn new(quota_per_minute: u32, min_spacing: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            quota_per_minute,
            min_spacing,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_PER_MINUTE_QUOTA, DEFAULT_MIN_SPACING)
    }

    /// Check whether a call under `op` may go out now. Never records.
    pub fn allow(&self, op: &str) -> Gate {
        let now = Instant::now();
        let mut map = self.inner.lock().expect("limiter mutex poisoned");
        let st = map.entry(op.to_string()).or_insert_with(|| KeyState {
            window_start: now,
            count: 0,
            last_call: None,
        });

        // Reset the counter once a full minute has elapsed since the window began.
        if now.duration_since(st.window_start) > WINDOW {
            st.window_start = now;
            st.count = 0;
        }

        // Quota exhausted for this window: come back when it resets.
        if st.count >= self.quota_per_minute {
            return Gate::closed(WINDOW);
        }

        // Spacing floor between consecutive calls on the same key.
        if let Some(last) = st.last_call {
            let since = now.duration_since(last);
            if since < self.min_spacing {
                return Gate::closed(self.min_spacing - since);
            }
        }

        Gate::open()
    }

    /// Bookkeeping for a call that actually went out: stamp the time and
    /// count it against the current window.
    pub fn record(&self, op: &str) {
        let now = Instant::now();
        let mut map = self.inner.lock().expect("limiter mutex poisoned");
        let st = map.entry(op.to_string()).or_insert_with(|| KeyState {
            window_start: now,
            count: 0,
            last_call: None,
        });

        if now.duration_since(st.window_start) > WINDOW {
            st.window_start = now;
            st.count = 0;
        }

        st.last_call = Some(now);
        st.count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn quota_denial_waits_full_window() {
        let limiter = RateLimiter::new(100, Duration::ZERO);
        for _ in 0..100 {
            let gate = limiter.allow("wall.get");
            assert!(gate.permitted);
            limiter.record("wall.get");
        }
        let gate = limiter.allow("wall.get");
        assert!(!gate.permitted);
        assert_eq!(gate.wait, Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn spacing_floor_returns_remaining_gap() {
        let limiter = RateLimiter::with_defaults();
        assert!(limiter.allow("groups.getById").permitted);
        limiter.record("groups.getById");

        advance(Duration::from_millis(100)).await;
        let gate = limiter.allow("groups.getById");
        assert!(!gate.permitted);
        assert_eq!(gate.wait, Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn window_resets_after_a_minute() {
        let limiter = RateLimiter::new(1, Duration::ZERO);
        limiter.record("op");
        assert!(!limiter.allow("op").permitted);

        advance(Duration::from_secs(61)).await;
        assert!(limiter.allow("op").permitted);
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_independent() {
        let limiter = RateLimiter::new(1, DEFAULT_MIN_SPACING);
        limiter.record("a");
        assert!(!limiter.allow("a").permitted);
        assert!(limiter.allow("b").permitted);
    }

    #[tokio::test(start_paused = true)]
    async fn allow_alone_never_consumes_quota() {
        let limiter = RateLimiter::new(1, Duration::ZERO);
        for _ in 0..10 {
            assert!(limiter.allow("probe").permitted);
        }
        limiter.record("probe");
        assert!(!limiter.allow("probe").permitted);
    }
}
