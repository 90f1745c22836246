//! Retrying operations that fail transiently
//!
//! Some API errors only mean "not yet" (eventual consistency, a policy that
//! references a principal created a moment ago). The operation decides what
//! is retryable by wrapping its error in [`RetryableError`].

use crate::context::Context;
use std::future::Future;
use std::time::{Duration, Instant};

/// Minimum wait between attempts
pub const RETRY_MIN_WAIT: Duration = Duration::from_millis(500);

const MAX_WAIT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum RetryableError<E> {
    Retryable(E),
    NonRetryable(E),
}

impl<E> RetryableError<E> {
    pub fn retryable(err: E) -> Self {
        RetryableError::Retryable(err)
    }

    pub fn non_retryable(err: E) -> Self {
        RetryableError::NonRetryable(err)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// Retryable errors kept occurring until the timeout
    #[error("timeout after {timeout:?}, last error: {last}")]
    Timeout { last: E, timeout: Duration },
    #[error("{0}")]
    NonRetryable(E),
    #[error("operation cancelled")]
    Cancelled,
}

impl<E> RetryError<E> {
    /// The underlying operation error, when there was one
    pub fn into_inner(self) -> Option<E> {
        match self {
            RetryError::Timeout { last, .. } => Some(last),
            RetryError::NonRetryable(err) => Some(err),
            RetryError::Cancelled => None,
        }
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or
/// `timeout` (bounded by the context deadline) elapses
pub async fn retry<T, E, F, Fut>(ctx: &Context, timeout: Duration, op: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RetryableError<E>>>,
{
    retry_with_min_wait(ctx, timeout, RETRY_MIN_WAIT, op).await
}

pub async fn retry_with_min_wait<T, E, F, Fut>(
    ctx: &Context,
    timeout: Duration,
    min_wait: Duration,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RetryableError<E>>>,
{
    let timeout = ctx.effective_timeout(timeout);
    let deadline = Instant::now() + timeout;
    let mut wait = Duration::from_millis(100);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let last = match op().await {
            Ok(value) => return Ok(value),
            Err(RetryableError::NonRetryable(err)) => return Err(RetryError::NonRetryable(err)),
            Err(RetryableError::Retryable(err)) => err,
        };

        let now = Instant::now();
        if now >= deadline {
            return Err(RetryError::Timeout { last, timeout });
        }

        tracing::debug!(attempt, ?wait, "Retrying after retryable error");

        let nap = wait.max(min_wait).min(deadline - now);
        let mut done = ctx.done();
        tokio::select! {
            _ = tokio::time::sleep(nap) => {}
            _ = done.wait_for(|cancelled| *cancelled) => {
                let deadline_passed = ctx.deadline().is_some_and(|d| Instant::now() >= d);
                return Err(if deadline_passed {
                    RetryError::Timeout { last, timeout }
                } else {
                    RetryError::Cancelled
                });
            }
        }

        wait = (wait * 2).min(MAX_WAIT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn succeeds_after_retryable_errors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let value = retry_with_min_wait(
            &Context::new(),
            Duration::from_secs(5),
            Duration::from_millis(1),
            || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(RetryableError::retryable("MalformedPolicy"))
                    } else {
                        Ok(n)
                    }
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn first_success_is_returned() {
        let result = tokio_test::block_on(retry(&Context::new(), Duration::from_secs(1), || async {
            Ok::<_, RetryableError<&str>>("job-1")
        }));
        assert_eq!(tokio_test::assert_ok!(result), "job-1");
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let err = retry(&Context::new(), Duration::from_secs(5), || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(RetryableError::non_retryable("AccessDenied")) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, RetryError::NonRetryable("AccessDenied")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn timeout_keeps_last_error() {
        let err = retry_with_min_wait(
            &Context::new(),
            Duration::from_millis(50),
            Duration::from_millis(10),
            || async { Err::<(), _>(RetryableError::retryable("still failing")) },
        )
        .await
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "timeout after 50ms, last error: still failing"
        );
    }
}
