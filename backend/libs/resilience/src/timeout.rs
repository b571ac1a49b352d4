/// Timeout wrapper for async operations
///
/// An elapsed timeout is reported as its own variant so callers can account
/// for it exactly like a connection failure.
use crate::metrics::TimeoutMetrics;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    pub duration: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TimeoutError<E: std::fmt::Display> {
    #[error("Operation timed out after {0:?}")]
    Elapsed(Duration),
    #[error("Operation failed: {0}")]
    Failed(E),
}

/// Execute a fallible future with timeout, keeping the inner error type
pub async fn with_timeout_result<F, T, E>(duration: Duration, future: F) -> Result<T, TimeoutError<E>>
where
    F: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let outcome = match timeout(duration, future).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(TimeoutError::Failed(e)),
        Err(_) => Err(TimeoutError::Elapsed(duration)),
    };
    TimeoutMetrics::record_operation(match &outcome {
        Ok(_) => "success",
        Err(TimeoutError::Failed(_)) => "failed",
        Err(TimeoutError::Elapsed(_)) => "elapsed",
    });
    outcome
}
