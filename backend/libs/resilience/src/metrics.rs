/// Prometheus metrics for the resilience guards
///
/// Without the `metrics` feature every recorder compiles to a no-op, so call
/// sites never need their own `cfg`.
#[cfg(feature = "metrics")]
use once_cell::sync::Lazy;
#[cfg(feature = "metrics")]
use prometheus::{register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec};

#[cfg(feature = "metrics")]
static CIRCUIT_BREAKER_STATE_TRANSITIONS: Lazy<Option<IntCounterVec>> = Lazy::new(|| {
    register_int_counter_vec!(
        "resilience_circuit_breaker_state_transitions_total",
        "Total number of circuit breaker state transitions",
        &["from", "to"]
    )
    .map_err(|e| tracing::warn!(error = %e, "Failed to register breaker transition metric"))
    .ok()
});

#[cfg(feature = "metrics")]
static TIMEOUT_OPERATIONS: Lazy<Option<IntCounterVec>> = Lazy::new(|| {
    register_int_counter_vec!(
        "resilience_timeout_operations_total",
        "Total number of timeout-guarded operations",
        &["result"]
    )
    .map_err(|e| tracing::warn!(error = %e, "Failed to register timeout metric"))
    .ok()
});

#[cfg(feature = "metrics")]
static RETRY_ATTEMPTS: Lazy<Option<HistogramVec>> = Lazy::new(|| {
    register_histogram_vec!(
        "resilience_retry_attempts",
        "Number of attempts before success or giving up",
        &["result"]
    )
    .map_err(|e| tracing::warn!(error = %e, "Failed to register retry metric"))
    .ok()
});

/// Metrics collector for circuit breaker
#[cfg(feature = "metrics")]
pub struct CircuitBreakerMetrics;

#[cfg(feature = "metrics")]
impl CircuitBreakerMetrics {
    pub fn record_state_transition(from: &str, to: &str) {
        if let Some(counter) = CIRCUIT_BREAKER_STATE_TRANSITIONS.as_ref() {
            counter.with_label_values(&[from, to]).inc();
        }
    }

    pub fn state_transitions(from: &str, to: &str) -> u64 {
        CIRCUIT_BREAKER_STATE_TRANSITIONS
            .as_ref()
            .map_or(0, |counter| counter.with_label_values(&[from, to]).get())
    }
}

/// Metrics collector for timeouts
#[cfg(feature = "metrics")]
pub struct TimeoutMetrics;

#[cfg(feature = "metrics")]
impl TimeoutMetrics {
    pub fn record_operation(result: &str) {
        if let Some(counter) = TIMEOUT_OPERATIONS.as_ref() {
            counter.with_label_values(&[result]).inc();
        }
    }
}

/// Metrics collector for retries
#[cfg(feature = "metrics")]
pub struct RetryMetrics;

#[cfg(feature = "metrics")]
impl RetryMetrics {
    pub fn record_attempts(result: &str, attempts: u32) {
        if let Some(histogram) = RETRY_ATTEMPTS.as_ref() {
            histogram.with_label_values(&[result]).observe(attempts as f64);
        }
    }
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub struct CircuitBreakerMetrics;

#[cfg(not(feature = "metrics"))]
impl CircuitBreakerMetrics {
    pub fn record_state_transition(_from: &str, _to: &str) {}
    pub fn state_transitions(_from: &str, _to: &str) -> u64 {
        0
    }
}

#[cfg(not(feature = "metrics"))]
pub struct TimeoutMetrics;

#[cfg(not(feature = "metrics"))]
impl TimeoutMetrics {
    pub fn record_operation(_result: &str) {}
}

#[cfg(not(feature = "metrics"))]
pub struct RetryMetrics;

#[cfg(not(feature = "metrics"))]
impl RetryMetrics {
    pub fn record_attempts(_result: &str, _attempts: u32) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "metrics")]
    #[test]
    fn test_transition_counter_increments() {
        let before = CircuitBreakerMetrics::state_transitions("closed", "open");
        CircuitBreakerMetrics::record_state_transition("closed", "open");
        assert!(CircuitBreakerMetrics::state_transitions("closed", "open") > before);
    }

    #[cfg(not(feature = "metrics"))]
    #[test]
    fn test_recorders_are_inert_without_feature() {
        CircuitBreakerMetrics::record_state_transition("closed", "open");
        TimeoutMetrics::record_operation("elapsed");
        RetryMetrics::record_attempts("exhausted", 4);
        assert_eq!(CircuitBreakerMetrics::state_transitions("closed", "open"), 0);
    }
}
