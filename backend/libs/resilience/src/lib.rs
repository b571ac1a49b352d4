/// Resilience patterns for the slang discovery pipeline
///
/// This library provides the guards wrapped around every remote call:
/// - **Circuit Breaker**: failure-streak counter that blocks calls for a cool-down window
/// - **Timeout**: Enforces short time limits on external calls
/// - **Retry**: Exponential backoff with jitter for transient failures
/// - **Clock / Sleeper**: injectable time so breaker and backoff are testable
/// - **Metrics**: Prometheus counters behind the optional `metrics` feature
/// - **Preset Configurations**: Pre-tuned settings for dictionary, LLM and classifier calls
///
/// # Example: dictionary lookup guarded by a breaker
///
/// ```rust,no_run
/// use resilience::{presets, with_timeout_result, CircuitBreaker};
///
/// #[tokio::main]
/// async fn main() {
///     let config = presets::dictionary_lookup_config();
///     let circuit_breaker = CircuitBreaker::new(config.circuit_breaker.unwrap_or_default());
///
///     if !circuit_breaker.is_open() {
///         let result = with_timeout_result(config.timeout.duration, async {
///             // Your HTTP lookup here
///             Ok::<_, String>(())
///         })
///         .await;
///
///         match result {
///             Ok(()) => circuit_breaker.record_success(),
///             Err(_) => circuit_breaker.record_failure(),
///         }
///     }
/// }
/// ```

pub mod circuit_breaker;
pub mod clock;
pub mod metrics;
pub mod presets;
pub mod retry;
pub mod timeout;

// Re-export main types for convenience
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use clock::{Clock, ManualClock, RecordingSleeper, Sleeper, SystemClock, TokioSleeper};
pub use presets::{
    classifier_config, dictionary_lookup_config, llm_adjudication_config, source_fetch_config,
    ServiceConfig,
};
pub use retry::{with_retry, RetryConfig, RetryError};
pub use timeout::{with_timeout_result, TimeoutConfig, TimeoutError};
