/// Circuit Breaker implementation with consecutive-failure tracking
///
/// State transitions:
/// - Closed → Open: when the failure streak reaches the threshold inside the tracking window
/// - Open → Closed: once `open_until` has passed
///
/// The breaker state is process-wide for one remote dependency: every caller
/// shares the same streak, so concurrent workers trip it together.
use crate::clock::{Clock, SystemClock};
use crate::metrics::CircuitBreakerMetrics;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation, requests pass through
    Closed,
    /// Circuit is open, requests fail fast until the cool-down passes
    Open,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failure count to trigger circuit open
    pub failure_threshold: u32,
    /// How long the circuit stays open once tripped
    pub cool_down: Duration,
    /// Failures further apart than this do not extend a streak
    pub tracking_window: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cool_down: Duration::from_secs(120),
            tracking_window: Duration::from_secs(120),
        }
    }
}

#[derive(Clone)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    state: Arc<RwLock<CircuitBreakerState>>,
}

#[derive(Debug, Default)]
struct CircuitBreakerState {
    failure_streak: u32,
    last_failure_at: Option<DateTime<Utc>>,
    open_until: Option<DateTime<Utc>>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            state: Arc::new(RwLock::new(CircuitBreakerState::default())),
        }
    }

    /// True while `now < open_until`
    pub fn is_open(&self) -> bool {
        let now = self.clock.now();
        let mut state = self.state.write();

        match state.open_until {
            Some(open_until) if now < open_until => true,
            Some(_) => {
                info!("Circuit breaker: Open → Closed (cool-down elapsed)");
                CircuitBreakerMetrics::record_state_transition("open", "closed");
                state.open_until = None;
                false
            }
            None => false,
        }
    }

    /// A single success resets the streak
    pub fn record_success(&self) {
        let mut state = self.state.write();
        state.failure_streak = 0;
        state.last_failure_at = None;
    }

    pub fn record_failure(&self) {
        let now = self.clock.now();
        let window = chrono::Duration::from_std(self.config.tracking_window)
            .unwrap_or_else(|_| chrono::Duration::zero());
        let mut state = self.state.write();

        if let Some(last) = state.last_failure_at {
            if now - last > window {
                state.failure_streak = 0;
            }
        }

        state.failure_streak += 1;
        state.last_failure_at = Some(now);

        if state.failure_streak >= self.config.failure_threshold {
            let cool_down = chrono::Duration::from_std(self.config.cool_down)
                .unwrap_or_else(|_| chrono::Duration::zero());
            let open_until = now + cool_down;
            if state.open_until.is_none() {
                warn!(
                    failures = state.failure_streak,
                    cool_down_secs = self.config.cool_down.as_secs(),
                    "Circuit breaker: Closed → Open"
                );
                CircuitBreakerMetrics::record_state_transition("closed", "open");
            }
            state.open_until = Some(open_until);
        }
    }

    /// Get current circuit state (for monitoring)
    pub fn state(&self) -> CircuitState {
        if self.is_open() {
            CircuitState::Open
        } else {
            CircuitState::Closed
        }
    }

    pub fn failure_streak(&self) -> u32 {
        self.state.read().failure_streak
    }

    pub fn open_until(&self) -> Option<DateTime<Utc>> {
        self.state.read().open_until
    }
}
