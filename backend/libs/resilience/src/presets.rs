/// Preset configurations for the pipeline's remote dependencies
use crate::circuit_breaker::CircuitBreakerConfig;
use crate::retry::RetryConfig;
use crate::timeout::TimeoutConfig;
use std::time::Duration;

/// Configuration bundle for a remote dependency
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub timeout: TimeoutConfig,
    /// Only dependencies called many times per run carry a breaker
    pub circuit_breaker: Option<CircuitBreakerConfig>,
    pub retry: Option<RetryConfig>,
}

/// Standard-dictionary lookups
///
/// - Timeout: 5s
/// - Circuit breaker: 5 consecutive failures, 120s cooldown
/// - Retry: 4 attempts, 0.6s base backoff, up to 0.25s jitter
pub fn dictionary_lookup_config() -> ServiceConfig {
    ServiceConfig {
        timeout: TimeoutConfig {
            duration: Duration::from_secs(5),
        },
        circuit_breaker: Some(CircuitBreakerConfig {
            failure_threshold: 5,
            cool_down: Duration::from_secs(120),
            tracking_window: Duration::from_secs(120),
        }),
        retry: Some(RetryConfig {
            max_attempts: 4,
            base_backoff: Duration::from_millis(600),
            max_backoff: Duration::from_secs(10),
            jitter: Duration::from_millis(250),
        }),
    }
}

/// LLM adjudication (one batch call per run)
///
/// - Timeout: 9s
/// - Retry: 2 attempts, rate limits are common
pub fn llm_adjudication_config() -> ServiceConfig {
    ServiceConfig {
        timeout: TimeoutConfig {
            duration: Duration::from_secs(9),
        },
        circuit_breaker: None,
        retry: Some(RetryConfig {
            max_attempts: 2,
            base_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(8),
            jitter: Duration::from_millis(500),
        }),
    }
}

/// Slang classifier model server
///
/// - Timeout: 8s
/// - Retry: 2 attempts
pub fn classifier_config() -> ServiceConfig {
    ServiceConfig {
        timeout: TimeoutConfig {
            duration: Duration::from_secs(8),
        },
        circuit_breaker: None,
        retry: Some(RetryConfig {
            max_attempts: 2,
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(2),
            jitter: Duration::from_millis(100),
        }),
    }
}

/// Text source fetches (community boards, feeds)
///
/// - Timeout: 8s
/// - No retry: a failed source is simply skipped for the run
pub fn source_fetch_config() -> ServiceConfig {
    ServiceConfig {
        timeout: TimeoutConfig {
            duration: Duration::from_secs(8),
        },
        circuit_breaker: None,
        retry: None,
    }
}
