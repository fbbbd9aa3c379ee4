//! Circuit breaker (§4.7): consecutive-failure model, sits closest to the
//! network call in the timeout ∘ retry ∘ breaker composition (§9).

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use snapback_domain::model::BreakerState;

pub struct CircuitBreaker {
    fail_threshold: u32,
    success_threshold: u32,
    recovery: chrono::Duration,
    inner: Mutex<Inner>,
}

struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    next_attempt_at: Option<DateTime<Utc>>,
}

/// Whether a call is currently admitted, distinguishing the synthetic
/// open-circuit rejection from a real attempt.
pub enum Admission {
    Admitted,
    Rejected,
}

impl CircuitBreaker {
    pub fn new(fail_threshold: u32, success_threshold: u32, recovery_ms: u64) -> Self {
        Self {
            fail_threshold,
            success_threshold,
            recovery: chrono::Duration::milliseconds(recovery_ms as i64),
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                next_attempt_at: None,
            }),
        }
    }

    pub fn state(&self) -> BreakerState {
        self.inner.lock().state
    }

    /// Checks admission and transitions Open → HalfOpen if the recovery
    /// window has elapsed.
    pub fn admit(&self) -> Admission {
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::Closed | BreakerState::HalfOpen => Admission::Admitted,
            BreakerState::Open => {
                let now = Utc::now();
                if inner.next_attempt_at.map(|t| now >= t).unwrap_or(true) {
                    inner.state = BreakerState::HalfOpen;
                    inner.consecutive_successes = 0;
                    Admission::Admitted
                } else {
                    Admission::Rejected
                }
            }
        }
    }

    pub fn on_success(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::Closed => {
                inner.consecutive_failures = 0;
            }
            BreakerState::HalfOpen => {
                inner.consecutive_successes += 1;
                if inner.consecutive_successes >= self.success_threshold {
                    inner.state = BreakerState::Closed;
                    inner.consecutive_failures = 0;
                    inner.consecutive_successes = 0;
                    inner.next_attempt_at = None;
                }
            }
            BreakerState::Open => {}
        }
    }

    pub fn on_failure(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.fail_threshold {
                    inner.state = BreakerState::Open;
                    inner.next_attempt_at = Some(Utc::now() + self.recovery);
                }
            }
            BreakerState::HalfOpen => {
                inner.state = BreakerState::Open;
                inner.consecutive_successes = 0;
                inner.next_attempt_at = Some(Utc::now() + self.recovery);
            }
            BreakerState::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_n_consecutive_failures() {
        let breaker = CircuitBreaker::new(3, 2, 30_000);
        for _ in 0..3 {
            assert!(matches!(breaker.admit(), Admission::Admitted));
            breaker.on_failure();
        }
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(matches!(breaker.admit(), Admission::Rejected));
    }

    #[test]
    fn success_resets_closed_counter() {
        let breaker = CircuitBreaker::new(3, 2, 30_000);
        breaker.on_failure();
        breaker.on_failure();
        breaker.on_success();
        breaker.on_failure();
        breaker.on_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn half_open_closes_after_m_successes() {
        let breaker = CircuitBreaker::new(1, 2, 0);
        breaker.on_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(matches!(breaker.admit(), Admission::Admitted));
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        breaker.on_success();
        breaker.on_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn half_open_failure_reopens() {
        let breaker = CircuitBreaker::new(1, 2, 0);
        breaker.on_failure();
        let _ = breaker.admit();
        breaker.on_success();
        breaker.on_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
    }
}
