/// Injectable time sources
///
/// Everything time-dependent in the pipeline (cache expiry, breaker cool-down,
/// retry backoff) reads time through [`Clock`] and waits through [`Sleeper`],
/// so tests can freeze or fast-forward time instead of sleeping for real.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Intended for tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Starts at the current wall-clock time
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero());
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Sleeper that returns immediately and remembers every requested delay.
///
/// When built with [`RecordingSleeper::advancing`] it also moves a
/// [`ManualClock`] forward by the requested amount.
#[derive(Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
    clock: Option<Arc<ManualClock>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advancing(clock: Arc<ManualClock>) -> Self {
        Self {
            slept: Mutex::new(Vec::new()),
            clock: Some(clock),
        }
    }

    pub fn recorded(&self) -> Vec<Duration> {
        self.slept.lock().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().push(duration);
        if let Some(clock) = &self.clock {
            clock.advance(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::starting_now();
        let start = clock.now();
        clock.advance(Duration::from_secs(90));
        assert_eq!((clock.now() - start).num_seconds(), 90);
    }

    #[tokio::test]
    async fn test_recording_sleeper_moves_clock() {
        let clock = Arc::new(ManualClock::starting_now());
        let start = clock.now();
        let sleeper = RecordingSleeper::advancing(clock.clone());

        sleeper.sleep(Duration::from_millis(600)).await;
        sleeper.sleep(Duration::from_millis(1200)).await;

        assert_eq!(
            sleeper.recorded(),
            vec![Duration::from_millis(600), Duration::from_millis(1200)]
        );
        assert_eq!((clock.now() - start).num_milliseconds(), 1800);
    }
}
