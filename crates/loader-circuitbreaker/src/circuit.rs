use crate::config::CircuitBreakerConfig;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Point-in-time statistics for one breaker.
#[derive(Debug, Clone, Copy)]
pub struct CircuitStats {
    pub state: CircuitState,
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub error_rate: f64,
    pub consecutive_successes: usize,
}

/// The state machine for one provider's breaker (§4.4).
///
/// State transitions are driven entirely by `can_execute`, `record_success`
/// and `record_failure`; there is no background timer. The Open→HalfOpen
/// check happens lazily, the first time any of those three methods runs
/// after the recovery timeout has elapsed.
pub struct Circuit {
    config: CircuitBreakerConfig,
    state: CircuitState,
    requests: VecDeque<bool>,
    last_failure_time: Option<Instant>,
    last_state_change: Instant,
    consecutive_successes: usize,
    /// Probes currently admitted and not yet resolved, reserved by
    /// `can_execute` and released by whichever of `record_success`/
    /// `record_failure` reports that probe's outcome. Bounds concurrent
    /// Half-Open traffic to `half_open_max_requests` regardless of how
    /// many callers check `can_execute` before any of them finish.
    half_open_requests: usize,
}

impl Circuit {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: CircuitState::Closed,
            requests: VecDeque::with_capacity(config.window_size),
            last_failure_time: None,
            last_state_change: Instant::now(),
            consecutive_successes: 0,
            half_open_requests: 0,
        }
    }

    fn check_transition(&mut self) {
        if self.state == CircuitState::Open {
            if let Some(last_failure) = self.last_failure_time {
                if last_failure.elapsed() >= self.config.recovery_timeout {
                    self.transition_to(CircuitState::HalfOpen);
                }
            }
        }
    }

    fn transition_to(&mut self, new_state: CircuitState) {
        if self.state == new_state {
            return;
        }
        tracing::info!(from = ?self.state, to = ?new_state, "circuit breaker state transition");
        self.state = new_state;
        self.last_state_change = Instant::now();
        if new_state == CircuitState::HalfOpen {
            self.half_open_requests = 0;
            self.consecutive_successes = 0;
        }
    }

    fn error_rate(&self) -> f64 {
        if self.requests.is_empty() {
            return 0.0;
        }
        let failures = self.requests.iter().filter(|ok| !**ok).count();
        failures as f64 / self.requests.len() as f64
    }

    /// Current state, after applying any pending lazy transition.
    pub fn state(&mut self) -> CircuitState {
        self.check_transition();
        self.state
    }

    /// Whether a new call may proceed right now. Admitting a Half-Open
    /// probe reserves its slot immediately, so concurrent callers can't all
    /// pass this check before any of them reports an outcome.
    pub fn can_execute(&mut self) -> bool {
        self.check_transition();
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                if self.half_open_requests < self.config.half_open_max_requests {
                    self.half_open_requests += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn push_outcome(&mut self, success: bool) {
        if self.requests.len() == self.config.window_size {
            self.requests.pop_front();
        }
        self.requests.push_back(success);
    }

    pub fn record_success(&mut self) {
        self.push_outcome(true);
        self.consecutive_successes += 1;

        if self.state == CircuitState::HalfOpen {
            self.half_open_requests = self.half_open_requests.saturating_sub(1);
            if self.consecutive_successes >= self.config.half_open_max_requests {
                self.transition_to(CircuitState::Closed);
            }
        }
    }

    pub fn record_failure(&mut self) {
        self.push_outcome(false);
        self.last_failure_time = Some(Instant::now());
        self.consecutive_successes = 0;

        if self.state == CircuitState::HalfOpen {
            self.half_open_requests = self.half_open_requests.saturating_sub(1);
            self.transition_to(CircuitState::Open);
            return;
        }

        if self.state == CircuitState::Closed
            && self.requests.len() >= self.config.min_requests
            && self.error_rate() >= self.config.error_threshold
        {
            self.transition_to(CircuitState::Open);
        }
    }

    pub fn force_open(&mut self) {
        self.transition_to(CircuitState::Open);
        self.last_failure_time = Some(Instant::now());
    }

    pub fn force_closed(&mut self) {
        self.transition_to(CircuitState::Closed);
    }

    pub fn reset(&mut self) {
        self.state = CircuitState::Closed;
        self.requests.clear();
        self.last_failure_time = None;
        self.last_state_change = Instant::now();
        self.consecutive_successes = 0;
        self.half_open_requests = 0;
    }

    pub fn time_in_current_state(&self) -> Duration {
        self.last_state_change.elapsed()
    }

    pub fn stats(&mut self) -> CircuitStats {
        self.check_transition();
        let total = self.requests.len();
        let successes = self.requests.iter().filter(|ok| **ok).count();
        CircuitStats {
            state: self.state,
            total_requests: total,
            successful_requests: successes,
            failed_requests: total - successes,
            error_rate: self.error_rate(),
            consecutive_successes: self.consecutive_successes,
        }
    }
}
