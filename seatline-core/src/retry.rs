use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::ReservationError;

/// Bounded retry for optimistic-concurrency conflicts.
///
/// Only errors for which [`ReservationError::is_retryable`] holds are retried.
/// The delay table is computed once: with the defaults (3 attempts, 100ms base,
/// factor 2) the waits are 100ms then 200ms.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: usize,
    delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100), 2)
    }
}

impl RetryPolicy {
    /// `max_attempts` counts the first try; it is clamped to at least 1.
    pub fn new(max_attempts: usize, initial_backoff: Duration, multiplier: u32) -> Self {
        let max_attempts = max_attempts.max(1);
        let mut delays = Vec::with_capacity(max_attempts - 1);
        let mut delay = initial_backoff;
        for _ in 1..max_attempts {
            delays.push(delay);
            delay = delay.saturating_mul(multiplier);
        }
        Self { max_attempts, delays }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Wait before attempt `attempt + 1`, for 1-based `attempt`.
    pub fn delay_after(&self, attempt: usize) -> Option<Duration> {
        attempt.checked_sub(1).and_then(|i| self.delays.get(i)).copied()
    }

    /// Runs `operation` (given the 1-based attempt number) until it succeeds,
    /// fails terminally, or the attempt budget is spent. The last error is returned.
    pub async fn run<F, Fut, T>(&self, mut operation: F) -> Result<T, ReservationError>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, ReservationError>>,
    {
        let mut attempt = 1;
        loop {
            let err = match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(attempt, "Reservation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                return Err(err);
            }

            match self.delay_after(attempt) {
                Some(delay) => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying after conflict: {}", err
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    warn!(attempt, "Retry budget exhausted: {}", err);
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    #[test]
    fn test_default_delay_table() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_after(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_after(2), Some(Duration::from_millis(200)));
        assert_eq!(policy.delay_after(3), None);
        assert_eq!(policy.delay_after(0), None);
    }

    #[test]
    fn test_single_attempt_policy_never_waits() {
        let policy = RetryPolicy::new(0, Duration::from_millis(100), 2);
        assert_eq!(policy.max_attempts(), 1);
        assert_eq!(policy.delay_after(1), None);
    }

    #[tokio::test]
    async fn test_conflicts_are_retried_until_budget_is_spent() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), 2);
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let flight_id = Uuid::new_v4();

        let result: Result<(), _> = policy
            .run(move |_| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ReservationError::Conflict(flight_id))
            })
            .await;

        assert!(matches!(result, Err(ReservationError::Conflict(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_conflict_then_success() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), 2);
        let flight_id = Uuid::new_v4();

        let result = policy
            .run(move |attempt| async move {
                if attempt < 2 {
                    Err(ReservationError::Conflict(flight_id))
                } else {
                    Ok(attempt)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_terminal_errors_are_not_retried() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), 2);
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        let result: Result<(), _> = policy
            .run(move |_| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ReservationError::InsufficientSeats { available: 0, requested: 3 })
            })
            .await;

        assert!(matches!(result, Err(ReservationError::InsufficientSeats { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_conflict_can_resolve_into_insufficient_seats() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), 2);
        let flight_id = Uuid::new_v4();

        let result: Result<(), _> = policy
            .run(move |attempt| async move {
                if attempt == 1 {
                    Err(ReservationError::Conflict(flight_id))
                } else {
                    Err(ReservationError::InsufficientSeats { available: 1, requested: 3 })
                }
            })
            .await;

        assert!(matches!(
            result,
            Err(ReservationError::InsufficientSeats { available: 1, requested: 3 })
        ));
    }
}
