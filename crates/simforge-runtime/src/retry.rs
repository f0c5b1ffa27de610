//! Retry-then-fallback combinator.
//!
//! The pipeline's robustness strategy is a bounded logical retry, not a
//! network retry: run an operation up to `times` attempts with the same
//! input and no backoff, and let the caller fall back deterministically
//! once the attempts are exhausted. Implemented once here and applied
//! uniformly across stages.

use std::future::Future;

/// Outcome of a bounded attempt run.
#[derive(Debug)]
pub struct Attempted<T, E> {
    /// The first success, or the error from the final attempt
    pub result: Result<T, E>,

    /// Number of attempts actually made (>= 1)
    pub attempts: u32,
}

impl<T, E> Attempted<T, E> {
    pub fn exhausted(&self) -> bool {
        self.result.is_err()
    }
}

/// Run `op` up to `times` attempts, stopping at the first success.
///
/// The closure receives the 1-based attempt number, which callers
/// typically only use for logging.
pub async fn attempt<T, E, F, Fut>(times: u32, mut op: F) -> Attempted<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    debug_assert!(times >= 1);
    let mut attempts = 0;
    loop {
        attempts += 1;
        match op(attempts).await {
            Ok(value) => {
                return Attempted {
                    result: Ok(value),
                    attempts,
                }
            }
            Err(err) if attempts >= times => {
                return Attempted {
                    result: Err(err),
                    attempts,
                }
            }
            Err(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_first_attempt_success() {
        let outcome: Attempted<i32, &str> = attempt(2, |_| async { Ok(42) }).await;
        assert_eq!(outcome.result.unwrap(), 42);
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    async fn test_second_attempt_success() {
        let calls = AtomicU32::new(0);
        let outcome: Attempted<i32, &str> = attempt(2, |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err("transient")
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(outcome.result.unwrap(), 7);
        assert_eq!(outcome.attempts, 2);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error_and_count() {
        let outcome: Attempted<i32, String> =
            attempt(2, |n| async move { Err(format!("fail {n}")) }).await;
        assert!(outcome.exhausted());
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.result.unwrap_err(), "fail 2");
    }

    #[tokio::test]
    async fn test_never_exceeds_bound() {
        let calls = AtomicU32::new(0);
        let _: Attempted<(), &str> = attempt(2, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("always") }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
