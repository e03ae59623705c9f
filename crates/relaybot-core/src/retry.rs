use std::{future::Future, time::Duration};

use tokio::time::sleep;

/// Exponential backoff: `base_delay * factor^attempt` after each failure.
///
/// The defaults give 100ms, 1s, 10s, 100s for four retries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            base_delay: Duration::from_millis(100),
            factor: 10,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let multiplier = self.factor.saturating_pow(attempt);
        self.base_delay.saturating_mul(multiplier)
    }
}

/// Run `op`, retrying on failure up to `policy.max_retries` extra times.
///
/// `on_retry` sees each failed attempt's error right before its backoff sleep.
/// Returns the last error unchanged once attempts are exhausted.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
    mut on_retry: impl FnMut(u32, &E),
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut result = op().await;
    for attempt in 0..policy.max_retries {
        let Err(err) = &result else {
            break;
        };
        on_retry(attempt, err);
        sleep(policy.delay_for(attempt)).await;
        result = op().await;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use tokio::time::Instant;

    #[test]
    fn default_delays_grow_by_ten() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay_for(0), Duration::from_millis(100));
        assert_eq!(p.delay_for(1), Duration::from_secs(1));
        assert_eq!(p.delay_for(2), Duration::from_secs(10));
        assert_eq!(p.delay_for(3), Duration::from_secs(100));
    }

    #[test]
    fn huge_attempt_saturates_instead_of_overflowing() {
        let p = RetryPolicy::default();
        assert_eq!(
            p.delay_for(64),
            Duration::from_millis(100).saturating_mul(u32::MAX)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_k_failures() {
        let calls = Cell::new(0u32);
        let retries = Cell::new(0u32);

        let out: Result<&str, String> = with_retry(
            &RetryPolicy::default(),
            || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n <= 2 {
                        Err(format!("fail {n}"))
                    } else {
                        Ok("done")
                    }
                }
            },
            |_, _| retries.set(retries.get() + 1),
        )
        .await;

        assert_eq!(out, Ok("done"));
        assert_eq!(calls.get(), 3);
        assert_eq!(retries.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_does_not_sleep() {
        let start = Instant::now();
        let out: Result<u8, ()> =
            with_retry(&RetryPolicy::default(), || async { Ok(1) }, |_, _| {}).await;
        assert_eq!(out, Ok(1));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn always_failing_returns_last_error_with_backoff_sequence() {
        let calls = RefCell::new(Vec::<Instant>::new());
        let seen = RefCell::new(Vec::<(u32, String)>::new());

        let out: Result<(), String> = with_retry(
            &RetryPolicy::default(),
            || {
                calls.borrow_mut().push(Instant::now());
                let n = calls.borrow().len();
                async move { Err(format!("fail {n}")) }
            },
            |attempt, err: &String| seen.borrow_mut().push((attempt, err.clone())),
        )
        .await;

        assert_eq!(out, Err("fail 5".to_string()));

        let calls = calls.into_inner();
        assert_eq!(calls.len(), 5);
        let gaps: Vec<Duration> = calls.windows(2).map(|w| w[1] - w[0]).collect();
        let expected = [
            Duration::from_millis(100),
            Duration::from_secs(1),
            Duration::from_secs(10),
            Duration::from_secs(100),
        ];
        for (gap, want) in gaps.iter().zip(expected) {
            assert!(
                *gap >= want && *gap < want + Duration::from_millis(5),
                "gap {gap:?} != {want:?}"
            );
        }

        let seen = seen.into_inner();
        assert_eq!(
            seen.iter().map(|(a, _)| *a).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
        assert_eq!(seen[0].1, "fail 1");
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_calls_once() {
        let calls = Cell::new(0u32);
        let policy = RetryPolicy {
            max_retries: 0,
            ..RetryPolicy::default()
        };
        let out: Result<(), &str> = with_retry(
            &policy,
            || {
                calls.set(calls.get() + 1);
                async { Err("nope") }
            },
            |_, _| {},
        )
        .await;
        assert_eq!(out, Err("nope"));
        assert_eq!(calls.get(), 1);
    }
}
