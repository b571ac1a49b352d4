//! Standard-dictionary oracle.
//!
//! Answers "is this a standard dictionary word?" behind a disk cache, a
//! retry loop and a process-wide circuit breaker. Every failure degrades to
//! `false`; nothing here is ever surfaced to the pipeline as an error.

mod cache;
mod client;

pub use cache::{CacheLog, DictionaryCache, DictionaryCacheEntry};
pub use client::{
    is_retryable_status, parse_is_standard, DictionaryResponse, DictionaryTransport,
    NaverDictionaryClient,
};

use crate::config::DictionaryConfig;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use resilience::{
    with_timeout_result, CircuitBreaker, CircuitBreakerConfig, Clock, RetryConfig, Sleeper,
    SystemClock, TimeoutError, TokioSleeper,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// TTLs and attempt budget for one lookup
#[derive(Debug, Clone)]
pub struct LookupPolicy {
    pub ttl: Duration,
    pub failure_ttl: Duration,
    pub breaker_open_ttl: Duration,
    pub retry: RetryConfig,
    pub timeout: Duration,
    pub concurrency: usize,
}

impl From<&DictionaryConfig> for LookupPolicy {
    fn from(config: &DictionaryConfig) -> Self {
        Self {
            ttl: config.ttl,
            failure_ttl: config.failure_ttl,
            breaker_open_ttl: config.breaker_open_ttl,
            retry: RetryConfig {
                max_attempts: config.max_attempts,
                base_backoff: config.base_backoff,
                max_backoff: config.max_backoff,
                jitter: config.jitter,
            },
            timeout: config.timeout,
            concurrency: config.concurrency,
        }
    }
}

fn breaker_config(config: &DictionaryConfig) -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        failure_threshold: config.breaker_threshold,
        cool_down: config.breaker_window,
        tracking_window: config.breaker_window,
    }
}

pub struct DictionaryOracle {
    transport: Arc<dyn DictionaryTransport>,
    cache: Mutex<DictionaryCache>,
    log: Option<CacheLog>,
    breaker: CircuitBreaker,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    policy: LookupPolicy,
}

impl DictionaryOracle {
    pub fn new(
        config: &DictionaryConfig,
        transport: Arc<dyn DictionaryTransport>,
        cache: DictionaryCache,
    ) -> Self {
        Self::with_time(
            config,
            transport,
            cache,
            Arc::new(SystemClock),
            Arc::new(TokioSleeper),
        )
    }

    /// Build with an injected clock and sleeper, shared with the breaker
    pub fn with_time(
        config: &DictionaryConfig,
        transport: Arc<dyn DictionaryTransport>,
        cache: DictionaryCache,
        clock: Arc<dyn Clock>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            transport,
            log: cache.log(),
            cache: Mutex::new(cache),
            breaker: CircuitBreaker::with_clock(breaker_config(config), clock.clone()),
            clock,
            sleeper,
            policy: LookupPolicy::from(config),
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Unexpired cached verdict, without any remote call
    pub fn cached(&self, word: &str) -> Option<bool> {
        let now = self.clock.now();
        self.cache.lock().get(word, now)
    }

    /// Index under the lock, append after releasing it
    async fn remember(&self, word: &str, ok: bool, ttl: Duration) {
        let now = self.clock.now();
        let entry = self.cache.lock().insert(word, ok, ttl, now);
        if let Some(log) = &self.log {
            if let Err(e) = log.append(&entry).await {
                warn!(word, error = %e, "Failed to append dictionary cache entry");
            }
        }
    }

    /// Whether `word` is a standard dictionary entry. Failures answer `false`.
    pub async fn is_standard(&self, word: &str) -> bool {
        if let Some(ok) = self.cached(word) {
            return ok;
        }

        if self.breaker.is_open() {
            debug!(word, "Circuit open, skipping dictionary lookup");
            self.remember(word, false, self.policy.breaker_open_ttl).await;
            return false;
        }

        let max_attempts = self.policy.retry.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            if attempt > 1 && self.breaker.is_open() {
                debug!(word, attempt, "Circuit opened mid-retry, giving up on lookup");
                self.remember(word, false, self.policy.breaker_open_ttl).await;
                return false;
            }

            let reason = match with_timeout_result(self.policy.timeout, self.transport.fetch(word))
                .await
            {
                Ok(response) if response.status == 200 => match parse_is_standard(&response.body) {
                    Ok(ok) => {
                        self.breaker.record_success();
                        self.remember(word, ok, self.policy.ttl).await;
                        return ok;
                    }
                    Err(e) => e.to_string(),
                },
                Ok(response) if is_retryable_status(response.status) => {
                    format!("retryable HTTP {}", response.status)
                }
                Ok(response) => {
                    self.breaker.record_failure();
                    warn!(word, status = response.status, "Dictionary lookup rejected");
                    self.remember(word, false, self.policy.failure_ttl).await;
                    return false;
                }
                Err(TimeoutError::Elapsed(after)) => format!("timed out after {:?}", after),
                Err(TimeoutError::Failed(e)) => e.to_string(),
            };

            self.breaker.record_failure();
            if attempt < max_attempts {
                let delay = self.policy.retry.backoff_for(attempt);
                debug!(
                    word,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    reason = %reason,
                    "Retrying dictionary lookup"
                );
                self.sleeper.sleep(delay).await;
            } else {
                warn!(word, attempts = attempt, reason = %reason, "Dictionary lookup failed");
            }
        }

        self.remember(word, false, self.policy.failure_ttl).await;
        false
    }

    /// Resolve cache hits inline, then look up the rest on a bounded pool
    pub async fn lookup_batch(&self, words: &[String]) -> HashMap<String, bool> {
        let unique: BTreeSet<&str> = words.iter().map(String::as_str).collect();
        let mut verdicts = HashMap::with_capacity(unique.len());
        let mut misses = Vec::new();

        for word in unique {
            match self.cached(word) {
                Some(ok) => {
                    verdicts.insert(word.to_string(), ok);
                }
                None => misses.push(word.to_string()),
            }
        }

        let cache_hits = verdicts.len();
        let looked_up: Vec<(String, bool)> = stream::iter(misses)
            .map(|word| async move {
                let ok = self.is_standard(&word).await;
                (word, ok)
            })
            .buffer_unordered(self.policy.concurrency.max(1))
            .collect()
            .await;

        let remote = looked_up.len();
        verdicts.extend(looked_up);

        info!(
            cache_hits,
            remote,
            standard = verdicts.values().filter(|ok| **ok).count(),
            breaker_open = self.breaker.is_open(),
            "Dictionary batch resolved"
        );
        verdicts
    }
}
