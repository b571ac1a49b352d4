/// Retry policy with exponential backoff and jitter
///
/// Retries are an explicit loop with an attempt counter; the wait between
/// attempts goes through a [`Sleeper`] so tests never block.
use crate::clock::Sleeper;
use crate::metrics::RetryMetrics;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Backoff before the second attempt
    pub base_backoff: Duration,
    /// Upper bound for a single backoff
    pub max_backoff: Duration,
    /// Upper bound of the random delay added on top of each backoff
    pub jitter: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_backoff: Duration::from_millis(600),
            max_backoff: Duration::from_secs(10),
            jitter: Duration::from_millis(250),
        }
    }
}

impl RetryConfig {
    /// Delay after failed attempt `attempt` (1-based): `base × 2^(attempt-1)` plus jitter
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let scaled = self.base_backoff.saturating_mul(1u32 << exponent);
        scaled.min(self.max_backoff) + random_jitter(self.jitter)
    }
}

fn random_jitter(bound: Duration) -> Duration {
    let bound_ms = bound.as_millis() as u64;
    if bound_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=bound_ms))
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E: std::fmt::Display> {
    #[error("Gave up after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: E },
}

impl<E: std::fmt::Display> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { last_error, .. } => last_error,
        }
    }
}

/// Execute a future with retry logic
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    sleeper: &dyn Sleeper,
    mut f: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match f().await {
            Ok(result) => {
                RetryMetrics::record_attempts("success", attempt);
                return Ok(result);
            }
            Err(e) => {
                if attempt >= max_attempts {
                    warn!(attempts = attempt, error = %e, "Max retries reached");
                    RetryMetrics::record_attempts("exhausted", attempt);
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last_error: e,
                    });
                }

                let delay = config.backoff_for(attempt);
                warn!(
                    "Retry attempt {}/{}, waiting {:?}: {}",
                    attempt, max_attempts, delay, e
                );
                sleeper.sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::RecordingSleeper;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn no_jitter(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_backoff: Duration::from_millis(600),
            max_backoff: Duration::from_secs(10),
            jitter: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_retry_success_on_first_attempt() {
        let sleeper = RecordingSleeper::new();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&no_jitter(4), &sleeper, move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, String>(42) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(sleeper.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_retry_success_after_failures() {
        let sleeper = RecordingSleeper::new();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&no_jitter(4), &sleeper, move || {
            let count = counter_clone.fetch_add(1, Ordering::SeqCst);
            async move {
                if count < 2 {
                    Err("temporary error")
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(
            sleeper.recorded(),
            vec![Duration::from_millis(600), Duration::from_millis(1200)]
        );
    }

    #[tokio::test]
    async fn test_retry_attempts_exhausted() {
        let sleeper = RecordingSleeper::new();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&no_jitter(3), &sleeper, move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, _>("persistent error") }
        })
        .await;

        assert!(matches!(
            result,
            Err(RetryError::Exhausted { attempts: 3, .. })
        ));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(sleeper.recorded().len(), 2);
    }

    #[test]
    fn test_exponential_backoff() {
        let config = no_jitter(4);
        assert_eq!(config.backoff_for(1), Duration::from_millis(600));
        assert_eq!(config.backoff_for(2), Duration::from_millis(1200));
        assert_eq!(config.backoff_for(3), Duration::from_millis(2400));
    }

    #[test]
    fn test_backoff_respects_cap_and_jitter_bound() {
        let config = RetryConfig {
            max_attempts: 10,
            base_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(5),
            jitter: Duration::from_millis(250),
        };

        for attempt in 1..=10 {
            let delay = config.backoff_for(attempt);
            assert!(delay <= Duration::from_millis(5250), "attempt {attempt}: {delay:?}");
        }
    }
}
