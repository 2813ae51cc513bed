//! Fixed-schedule backoff policy and the generic retry helper.

use std::future::Future;
use std::time::Duration;

use discforge_common::Result;

/// Fixed backoff schedule: `attempts` tries, sleeping `delays[i]` after the
/// i-th failure. When there are fewer delays than attempts the last delay
/// repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffSchedule {
    attempts: u32,
    delays: Vec<Duration>,
}

impl BackoffSchedule {
    pub fn new(attempts: u32, delays: Vec<Duration>) -> Self {
        Self {
            attempts: attempts.max(1),
            delays,
        }
    }

    /// Build a schedule from whole seconds.
    pub fn from_secs(attempts: u32, delays: &[u64]) -> Self {
        Self::new(
            attempts,
            delays.iter().copied().map(Duration::from_secs).collect(),
        )
    }

    /// A schedule that never sleeps.
    pub fn immediate(attempts: u32) -> Self {
        Self::new(attempts, Vec::new())
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay after the failed attempt with zero-based index `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.delays
            .get(attempt as usize)
            .or_else(|| self.delays.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    /// Sum of the sleeps between the configured attempts.
    pub fn total_wait(&self) -> Duration {
        (0..self.attempts.saturating_sub(1))
            .map(|i| self.delay_after(i))
            .sum()
    }
}

/// Run `op` until it succeeds or the schedule is exhausted.
///
/// `op` receives the zero-based attempt index. No sleep follows the final
/// attempt; the last error is returned. Environment errors are returned at
/// once, since no retry can fix a missing tool.
pub async fn retry_with_backoff<T, F, Fut>(
    schedule: &BackoffSchedule,
    label: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_environment() || attempt + 1 >= schedule.attempts() => return Err(e),
            Err(e) => {
                let delay = schedule.delay_after(attempt);
                tracing::warn!(
                    "{} attempt {}/{} failed: {}; retrying in {:?}",
                    label,
                    attempt + 1,
                    schedule.attempts(),
                    e,
                    delay
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use discforge_common::Error;
    use std::cell::Cell;

    #[test]
    fn test_delay_after_repeats_last() {
        let schedule = BackoffSchedule::from_secs(5, &[30, 20, 10]);
        assert_eq!(schedule.delay_after(0), Duration::from_secs(30));
        assert_eq!(schedule.delay_after(2), Duration::from_secs(10));
        assert_eq!(schedule.delay_after(4), Duration::from_secs(10));
    }

    #[test]
    fn test_total_wait() {
        let schedule = BackoffSchedule::from_secs(3, &[60, 30, 15]);
        assert_eq!(schedule.total_wait(), Duration::from_secs(90));
        assert_eq!(BackoffSchedule::immediate(3).total_wait(), Duration::ZERO);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(BackoffSchedule::immediate(0).attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_sleeps_between_attempts_only() {
        let schedule = BackoffSchedule::from_secs(3, &[30, 20, 10]);
        let calls = Cell::new(0);
        let start = tokio::time::Instant::now();

        let result: Result<()> = retry_with_backoff(&schedule, "probe", |_| {
            calls.set(calls.get() + 1);
            async { Err(Error::Probe("no streams".into())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.get(), 3);
        assert_eq!(start.elapsed().as_secs(), 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_returns_first_success() {
        let schedule = BackoffSchedule::from_secs(3, &[30, 20, 10]);
        let start = tokio::time::Instant::now();

        let result = retry_with_backoff(&schedule, "probe", |attempt| async move {
            if attempt == 1 {
                Ok(attempt)
            } else {
                Err(Error::Probe("flaky".into()))
            }
        })
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(start.elapsed().as_secs(), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_environment_error_is_not_retried() {
        let schedule = BackoffSchedule::from_secs(3, &[30, 20, 10]);
        let calls = Cell::new(0);
        let start = tokio::time::Instant::now();

        let result: Result<()> = retry_with_backoff(&schedule, "probe", |_| {
            calls.set(calls.get() + 1);
            async { Err(Error::tool_not_found("ffprobe")) }
        })
        .await;

        assert!(result.unwrap_err().is_environment());
        assert_eq!(calls.get(), 1);
        assert_eq!(start.elapsed().as_secs(), 0);
    }
}
