// src/ingest/retry.rs
//! Exponential backoff with bounded jitter.
//!
//! Delay after failed attempt `n` (0-based) is `base * 2^n + jitter`, with
//! `jitter` drawn from `[0, max_jitter]`. `max_jitter` is clamped to half
//! of `base`, so successive delays always strictly increase.

use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_jitter: Duration,
}

impl RetryPolicy {
    /// `max_retries` is the total number of attempts and is at least 1.
    pub fn new(max_retries: u32, base_delay: Duration, max_jitter: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            base_delay,
            max_jitter: max_jitter.min(base_delay / 2),
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn max_jitter(&self) -> Duration {
        self.max_jitter
    }

    /// Deterministic part of the delay plus a caller-provided jitter (clamped).
    pub fn delay_with_jitter(&self, attempt: u32, jitter: Duration) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .saturating_mul(factor)
            .saturating_add(jitter.min(self.max_jitter))
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let cap = self.max_jitter.as_millis() as u64;
        let jitter_ms = if cap == 0 {
            0
        } else {
            rand::rng().random_range(0..=cap)
        };
        self.delay_with_jitter(attempt, Duration::from_millis(jitter_ms))
    }
}

/// Classification of one failed attempt.
#[derive(Debug)]
pub enum AttemptError<E> {
    Retryable(E),
    Fatal(E),
}

#[derive(Debug)]
pub struct RetryFailure<E> {
    pub attempts: u32,
    pub last: E,
}

/// Run `op` until it succeeds, fails fatally, or the policy runs out of
/// attempts. `op` receives the 0-based attempt number. Sleeps only between
/// attempts, never after the last one.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, RetryFailure<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AttemptError<E>>>,
    E: Display,
{
    let mut attempt = 0u32;
    loop {
        match op(attempt).await {
            Ok(v) => return Ok(v),
            Err(AttemptError::Fatal(e)) => {
                debug!(target: "ingest", label, attempt, error = %e, "fatal failure, not retrying");
                return Err(RetryFailure {
                    attempts: attempt + 1,
                    last: e,
                });
            }
            Err(AttemptError::Retryable(e)) => {
                if attempt + 1 >= policy.max_retries {
                    debug!(target: "ingest", label, attempt, error = %e, "retries exhausted");
                    return Err(RetryFailure {
                        attempts: attempt + 1,
                        last: e,
                    });
                }
                let delay = policy.delay_for(attempt);
                debug!(
                    target: "ingest",
                    label,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient failure, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1000), Duration::from_millis(5000))
    }

    #[test]
    fn jitter_clamped_to_half_base() {
        assert_eq!(policy().max_jitter(), Duration::from_millis(500));
        assert_eq!(
            RetryPolicy::new(0, Duration::from_secs(1), Duration::ZERO).max_retries(),
            1
        );
    }

    #[test]
    fn delays_strictly_increase_even_with_worst_case_jitter() {
        let p = policy();
        let max_j = p.max_jitter();
        for n in 0..6 {
            let this_worst = p.delay_with_jitter(n, max_j);
            let next_best = p.delay_with_jitter(n + 1, Duration::ZERO);
            assert!(next_best > this_worst, "attempt {n}");
        }
        assert_eq!(p.delay_with_jitter(0, Duration::ZERO), Duration::from_millis(1000));
        assert_eq!(p.delay_with_jitter(2, Duration::ZERO), Duration::from_millis(4000));
    }

    #[test]
    fn random_delay_stays_in_band() {
        let p = policy();
        for _ in 0..50 {
            let d = p.delay_for(1);
            assert!(d >= Duration::from_millis(2000) && d <= Duration::from_millis(2500));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stops_after_max_retries() {
        let calls = AtomicU32::new(0);
        let res: Result<(), _> = retry_with_backoff(&policy(), "t", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AttemptError::Retryable("503")) }
        })
        .await;
        let fail = res.unwrap_err();
        assert_eq!(fail.attempts, 3);
        assert_eq!(fail.last, "503");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_short_circuits() {
        let calls = AtomicU32::new(0);
        let res: Result<(), _> = retry_with_backoff(&policy(), "t", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AttemptError::Fatal("404")) }
        })
        .await;
        assert_eq!(res.unwrap_err().attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_second_attempt() {
        let res = retry_with_backoff(&policy(), "t", |n| async move {
            if n == 0 {
                Err(AttemptError::Retryable("timeout"))
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(res.unwrap(), 1);
    }
}
