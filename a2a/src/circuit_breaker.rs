//! Per-target circuit breaker.
//!
//! Mutation is a small critical section guarded by a `std::sync::Mutex`
//! around the counters; `can_execute`/`record_success`/`record_failure` all
//! take `&self` so one breaker can be shared (e.g. via `Arc`) across
//! concurrent callers for the same target, matching 's "mutation is
//! a small critical section" requirement.

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
struct Inner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    half_open_calls: u32,
    last_failure_time: Option<Instant>,
}

/// Configuration.
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub timeout: Duration,
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(60),
            half_open_max_calls: 1,
        }
    }
}

pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                half_open_calls: 0,
                last_failure_time: None,
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().expect("circuit breaker mutex poisoned").state
    }

    /// Whether a call may proceed, advancing `open -> half_open` if the
    /// timeout has elapsed. Granting a half-open call consumes one of its
    /// `half_open_max_calls` probe slots, so this is not idempotent.
    pub fn can_execute(&self) -> bool {
        let mut inner = self.inner.lock().expect("circuit breaker mutex poisoned");
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => {
                if inner.half_open_calls < self.config.half_open_max_calls {
                    inner.half_open_calls += 1;
                    true
                } else {
                    false
                }
            }
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure_time
                    .map(|t| t.elapsed())
                    .unwrap_or(Duration::MAX);
                if elapsed >= self.config.timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_calls = 0;
                    tracing::info!(state = "half_open", "circuit breaker transition");
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker mutex poisoned");
        match inner.state {
            CircuitState::Closed => {
                inner.success_count += 1;
                inner.failure_count = inner.failure_count.saturating_sub(1);
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Closed;
                inner.failure_count = 0;
                inner.success_count = 0;
                inner.half_open_calls = 0;
                tracing::info!(state = "closed", "circuit breaker transition");
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker mutex poisoned");
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.last_failure_time = Some(Instant::now());
                    tracing::warn!(state = "open", "circuit breaker transition");
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.last_failure_time = Some(Instant::now());
                tracing::warn!(state = "open", "circuit breaker transition (probe failed)");
            }
            CircuitState::Open => {
                inner.last_failure_time = Some(Instant::now());
            }
        }
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker mutex poisoned");
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.success_count = 0;
        inner.half_open_calls = 0;
        inner.last_failure_time = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_breaker() -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 5,
            timeout: Duration::from_millis(20),
            half_open_max_calls: 1,
        })
    }

    #[test]
    fn threshold_minus_one_failures_stay_closed() {
        let b = fast_breaker();
        for _ in 0..4 {
            b.record_failure();
        }
        assert_eq!(b.state(), CircuitState::Closed);
        assert!(b.can_execute());
    }

    #[test]
    fn exactly_threshold_failures_opens() {
        let b = fast_breaker();
        for _ in 0..5 {
            b.record_failure();
        }
        assert_eq!(b.state(), CircuitState::Open);
        assert!(!b.can_execute());
    }

    #[test]
    fn success_decrements_failure_count_without_resetting() {
        let b = fast_breaker();
        for _ in 0..4 {
            b.record_failure();
        }
        b.record_success();
        // Was at 4/5; one success brings it to 3, not 0. Two more
        // failures should not yet open it, but three more should.
        b.record_failure();
        b.record_failure();
        assert_eq!(b.state(), CircuitState::Closed);
        b.record_failure();
        assert_eq!(b.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn opens_then_half_opens_after_timeout_then_closes_on_success() {
        let b = fast_breaker();
        for _ in 0..5 {
            b.record_failure();
        }
        assert_eq!(b.state(), CircuitState::Open);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(b.can_execute());
        assert_eq!(b.state(), CircuitState::HalfOpen);
        b.record_success();
        assert_eq!(b.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn half_open_caps_concurrent_probes_at_half_open_max_calls() {
        let b = fast_breaker();
        for _ in 0..5 {
            b.record_failure();
        }
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(b.can_execute());
        assert_eq!(b.state(), CircuitState::HalfOpen);
        assert!(!b.can_execute());
    }

    #[tokio::test]
    async fn half_open_failure_reopens() {
        let b = fast_breaker();
        for _ in 0..5 {
            b.record_failure();
        }
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(b.can_execute());
        b.record_failure();
        assert_eq!(b.state(), CircuitState::Open);
    }
}
