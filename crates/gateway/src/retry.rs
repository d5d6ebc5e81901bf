//! Bounded retry with exponential backoff.
//!
//! The router applies this only to side-effect-free requests; transient
//! transport failures are retried up to a bounded attempt count, permanent
//! failures return immediately.

use std::time::Duration;

use tokio::time::sleep;

/// Retry tuning for one route.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Cap on the per-retry delay.
    pub max_delay: Duration,
    /// Backoff multiplier applied per retry.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries; used for requests with side effects.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

/// Runs `operation` until it succeeds, fails permanently, or exhausts the
/// policy. `is_transient` decides whether a failure is worth another
/// attempt; the attempt number (1-based) is passed to the operation.
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    is_transient: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = policy.initial_delay;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempt, "operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(error) => {
                if !is_transient(&error) {
                    return Err(error);
                }
                if attempt >= policy.max_attempts {
                    tracing::warn!(attempt, error = %error, "retries exhausted");
                    return Err(error);
                }

                tracing::warn!(
                    attempt,
                    error = %error,
                    delay_ms = delay.as_millis() as u64,
                    "transient failure, retrying after delay"
                );
                sleep(delay).await;

                delay = Duration::from_millis(
                    ((delay.as_millis() as f64) * policy.multiplier) as u64,
                );
                delay = delay.min(policy.max_delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_backoff(&quick_policy(3), |_: &&str| true, |_attempt| {
            let counter = counter_clone.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("connection reset")
                } else {
                    Ok("response")
                }
            }
        })
        .await;

        assert_eq!(result, Ok("response"));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<(), &str> =
            retry_with_backoff(&quick_policy(2), |_: &&str| true, |_attempt| {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err("still down")
                }
            })
            .await;

        assert_eq!(result, Err("still down"));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<(), &str> =
            retry_with_backoff(&quick_policy(5), |_: &&str| false, |_attempt| {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err("bad request")
                }
            })
            .await;

        assert_eq!(result, Err("bad request"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn none_policy_makes_a_single_attempt() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<(), &str> =
            retry_with_backoff(&RetryPolicy::none(), |_: &&str| true, |_attempt| {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err("timeout")
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
